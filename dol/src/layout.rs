//! A uniform view over all sections of a header, for whoever maps the image into memory.

use std::{fmt, ops::Range};

use bitflags::bitflags;

use crate::header::{Header, Section};

/// Symbol name given to the entry point.
pub const ENTRY_SYMBOL: &str = "_start";

bitflags! {
    /// Access a loaded section should be mapped with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |flag, c| if self.contains(flag) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Permissions::READ, 'r'),
            flag(Permissions::WRITE, 'w'),
            flag(Permissions::EXECUTE, 'x')
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Data,
    Bss,
}

impl SectionKind {
    pub fn permissions(self) -> Permissions {
        match self {
            SectionKind::Text => Permissions::READ | Permissions::EXECUTE,
            SectionKind::Data | SectionKind::Bss => Permissions::READ | Permissions::WRITE,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            SectionKind::Text => ".text",
            SectionKind::Data => ".data",
            SectionKind::Bss => ".bss",
        }
    }
}

/// One section to be loaded, of any kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSection {
    pub kind: SectionKind,
    /// Position among the sections of the same kind.
    pub index: usize,
    /// `None` for BSS, which is zero-filled instead of read from the file.
    pub file_offset: Option<u32>,
    pub address: u32,
    pub size: u32,
}

impl LoadSection {
    /// `.text0`, `.data3`, `.bss1` and so on.
    pub fn name(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.index)
    }

    pub fn address_range(&self) -> Range<u64> {
        self.address as u64..self.address as u64 + self.size as u64
    }

    pub fn file_range(&self) -> Option<Range<u64>> {
        self.file_offset
            .map(|offset| offset as u64..offset as u64 + self.size as u64)
    }

    pub fn contains_addr(&self, addr: u32) -> bool {
        self.address_range().contains(&(addr as u64))
    }

    pub fn permissions(&self) -> Permissions {
        self.kind.permissions()
    }

    /// The file offset `addr` gets loaded from. `None` if `addr` is outside this section, if the
    /// section isn't backed by the file, or if the offset doesn't fit in 32 bits.
    pub fn file_offset_of_addr(&self, addr: u32) -> Option<u32> {
        if !self.contains_addr(addr) {
            return None;
        }
        self.file_offset?.checked_add(addr - self.address)
    }
}

impl fmt::Display for LoadSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Range { start, end } = self.address_range();
        write!(f, "{} ({start:#010x}..{end:#010x})", self.name())
    }
}

fn initialized(kind: SectionKind) -> impl Fn((usize, &Section)) -> LoadSection {
    move |(index, section)| LoadSection {
        kind,
        index,
        file_offset: Some(section.offset),
        address: section.address,
        size: section.size,
    }
}

impl Header {
    /// All sections: text first, then data, then the carved BSS fragments.
    pub fn load_sections(&self) -> impl Iterator<Item = LoadSection> + '_ {
        let text = self
            .text_sections()
            .iter()
            .enumerate()
            .map(initialized(SectionKind::Text));
        let data = self
            .data_sections()
            .iter()
            .enumerate()
            .map(initialized(SectionKind::Data));
        let bss = self
            .bss_sections()
            .iter()
            .enumerate()
            .map(|(index, section)| LoadSection {
                kind: SectionKind::Bss,
                index,
                file_offset: None,
                address: section.address,
                size: section.size,
            });

        text.chain(data).chain(bss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions() {
        assert_eq!(SectionKind::Text.permissions().to_string(), "r-x");
        assert_eq!(SectionKind::Data.permissions().to_string(), "rw-");
        assert_eq!(SectionKind::Bss.permissions().to_string(), "rw-");
    }

    #[test]
    fn names() {
        let section = LoadSection {
            kind: SectionKind::Data,
            index: 10,
            file_offset: Some(0x100),
            address: 0x80004000,
            size: 0x20,
        };
        assert_eq!(section.name(), ".data10");
        assert_eq!(section.to_string(), ".data10 (0x80004000..0x80004020)");
        assert_eq!(section.file_range(), Some(0x100..0x120));
    }

    #[test]
    fn bss_has_no_file_range() {
        let section = LoadSection {
            kind: SectionKind::Bss,
            index: 0,
            file_offset: None,
            address: 0x80004000,
            size: 0x20,
        };
        assert_eq!(section.file_range(), None);
        assert_eq!(section.file_offset_of_addr(0x80004010), None);
        assert!(section.contains_addr(0x8000401F));
        assert!(!section.contains_addr(0x80004020));
    }

    #[test]
    fn file_offset_of_addr() {
        let section = LoadSection {
            kind: SectionKind::Text,
            index: 0,
            file_offset: Some(0x100),
            address: 0x80003000,
            size: 0x200,
        };
        assert_eq!(section.file_offset_of_addr(0x80003000), Some(0x100));
        assert_eq!(section.file_offset_of_addr(0x800031FF), Some(0x2FF));
        assert_eq!(section.file_offset_of_addr(0x80003200), None);
        assert_eq!(section.file_offset_of_addr(0x80002FFF), None);
    }

    #[test]
    fn file_offset_past_4gib() {
        let section = LoadSection {
            kind: SectionKind::Data,
            index: 0,
            file_offset: Some(0xFFFF_FF00),
            address: 0x80003000,
            size: 0x200,
        };
        assert_eq!(section.file_offset_of_addr(0x800030FF), Some(0xFFFF_FFFF));
        assert_eq!(section.file_offset_of_addr(0x80003100), None);
    }
}
