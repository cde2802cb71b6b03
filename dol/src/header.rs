use std::ops::Range;

use arrayvec::ArrayVec;
use thiserror::Error;
use tracing::trace;

use crate::carve::carve;

/*
Start 	End 	Length 	Description
0x00 	0x1B 	28 	File offsets for Text0..6
0x1C 	0x47 	44 	File offsets for Data0..10
0x48 	0x63 	28 	Loading addresses for Text0..6
0x64 	0x8F 	44 	Loading addresses for Data0..10
0x90 	0xAB 	28 	Section sizes for Text0..6
0xAC 	0xD7 	44 	Section sizes for Data0..10
0xD8 	0xDB 	4 	BSS address
0xDC 	0xDF 	4 	BSS size
0xE0 	0xE3 	4 	Entry point
*/
pub const MAX_TEXT_SECTIONS: usize = 7;
pub const MAX_DATA_SECTIONS: usize = 11;
/// The number of bytes that need to be present to decode a header.
pub const HEADER_SIZE: usize = 0xE4;

const TEXT_OFFSETS_OFF: usize = 0x00;
const DATA_OFFSETS_OFF: usize = 0x1C;
const TEXT_ADDRESSES_OFF: usize = 0x48;
const DATA_ADDRESSES_OFF: usize = 0x64;
const TEXT_SIZES_OFF: usize = 0x90;
const DATA_SIZES_OFF: usize = 0xAC;
const BSS_ADDR_OFF: usize = 0xD8;
const BSS_SIZE_OFF: usize = 0xDC;
const ENTRYPOINT_OFF: usize = 0xE0;

/// The end of the 32-bit address space. Carving never looks past this.
const ADDRESS_SPACE_END: u64 = 1 << 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("insufficient data: header needs {:#x} bytes, got {len:#x}", HEADER_SIZE)]
    InsufficientData { len: usize },
}

/// A text or data section, backed by bytes in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub offset: u32,
    pub address: u32,
    pub size: u32,
}

impl Section {
    pub fn address_range(&self) -> Range<u64> {
        self.address as u64..self.address as u64 + self.size as u64
    }

    pub fn contains_addr(&self, addr: u32) -> bool {
        self.address_range().contains(&(addr as u64))
    }
}

/// A zero-filled section. Only has a location in memory, never in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BssSection {
    pub address: u32,
    pub size: u32,
}

/// The decoded DOL header.
///
/// Decoding does no validation: any header-sized buffer yields a `Header`. Use
/// [`crate::validate`] to find out whether it describes a loadable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    text: ArrayVec<Section, MAX_TEXT_SECTIONS>,
    data: ArrayVec<Section, MAX_DATA_SECTIONS>,
    bss: Vec<BssSection>,
    bss_address: u32,
    bss_size: u32,
    entrypoint: u32,
}

fn u32_at(bytes: &[u8], off: usize) -> u32 {
    let word: [u8; 4] = [bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]];
    u32::from_be_bytes(word)
}

/// Reads one section table. The first slot with a zero file offset ends the table,
/// whatever the slots after it contain.
fn section_table<const N: usize>(
    bytes: &[u8],
    offsets_off: usize,
    addresses_off: usize,
    sizes_off: usize,
) -> ArrayVec<Section, N> {
    (0..N)
        .map(|i| Section {
            offset: u32_at(bytes, offsets_off + i * 4),
            address: u32_at(bytes, addresses_off + i * 4),
            size: u32_at(bytes, sizes_off + i * 4),
        })
        .take_while(|section| section.offset != 0)
        .collect()
}

impl Header {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let Some(bytes) = bytes.get(..HEADER_SIZE) else {
            return Err(DecodeError::InsufficientData { len: bytes.len() });
        };

        let text = section_table(bytes, TEXT_OFFSETS_OFF, TEXT_ADDRESSES_OFF, TEXT_SIZES_OFF);
        let data = section_table(bytes, DATA_OFFSETS_OFF, DATA_ADDRESSES_OFF, DATA_SIZES_OFF);
        let bss_address = u32_at(bytes, BSS_ADDR_OFF);
        let bss_size = u32_at(bytes, BSS_SIZE_OFF);

        let bss = if bss_address != 0 {
            // Data sections may sit inside the declared BSS range, in which case only the
            // parts around them need zeroing.
            let clip = |range: Range<u64>| range.start..range.end.min(ADDRESS_SPACE_END);
            let nominal = clip(bss_address as u64..bss_address as u64 + bss_size as u64);
            let obstacles = text.iter().chain(&data).map(|s| clip(s.address_range()));

            carve(nominal, obstacles)
                .into_iter()
                .map(|fragment| {
                    trace!("bss fragment {:#x}..{:#x}", fragment.start, fragment.end);
                    // Both ends lie within the 32-bit address space and the start is never zero.
                    BssSection {
                        address: fragment.start as u32,
                        size: (fragment.end - fragment.start) as u32,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self {
            text,
            data,
            bss,
            bss_address,
            bss_size,
            entrypoint: u32_at(bytes, ENTRYPOINT_OFF),
        })
    }

    pub fn text_sections(&self) -> &[Section] {
        &self.text
    }

    pub fn data_sections(&self) -> &[Section] {
        &self.data
    }

    pub fn bss_sections(&self) -> &[BssSection] {
        &self.bss
    }

    /// The BSS address as declared in the header, before carving.
    pub fn bss_address(&self) -> u32 {
        self.bss_address
    }

    /// The BSS size as declared in the header, before carving.
    pub fn bss_size(&self) -> u32 {
        self.bss_size
    }

    pub fn entrypoint(&self) -> u32 {
        self.entrypoint
    }
}
