//! Parsing and validation of GameCube/Wii `.dol` executables.

pub mod carve;
pub mod header;
pub mod layout;
pub mod validate;

use thiserror::Error;

pub use header::{BssSection, DecodeError, HEADER_SIZE, Header, Section};
pub use layout::{ENTRY_SYMBOL, LoadSection, Permissions, SectionKind};
pub use validate::{LayoutError, check, validate, violations};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("invalid dol layout: {0}")]
    Layout(#[from] LayoutError),
}

/// A `.dol` file whose header has been decoded and validated.
#[derive(Debug)]
pub struct Dol {
    bytes: Vec<u8>,
    header: Header,
}

impl Dol {
    /// Create a new DOL from the given bytes, validating it in the process.
    pub fn new(bytes: Vec<u8>) -> Result<Self, Error> {
        let header = Header::decode(&bytes)?;
        check(&header, bytes.len() as u64)?;
        Ok(Self { bytes, header })
    }

    /// Whether `bytes` look like a loadable `.dol` file.
    pub fn is_valid(bytes: &[u8]) -> bool {
        Header::decode(bytes).is_ok_and(|header| validate(&header, bytes.len() as u64))
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn entrypoint(&self) -> u32 {
        self.header.entrypoint()
    }

    pub fn section_of_load_addr(&self, addr: u32) -> Option<LoadSection> {
        self.header.load_sections().find(|s| s.contains_addr(addr))
    }

    /// The file offset `addr` gets loaded from, or `None` if it isn't backed by the file.
    pub fn file_offset_of_addr(&self, addr: u32) -> Option<u32> {
        self.section_of_load_addr(addr)?.file_offset_of_addr(addr)
    }

    /// The file contents from `addr` up to the end of its section.
    pub fn slice_from_load_addr(&self, addr: u32) -> Option<&[u8]> {
        let section = self.section_of_load_addr(addr)?;
        let start = section.file_offset_of_addr(addr)? as usize;
        let end = section.file_range()?.end as usize;
        Some(&self.bytes[start..end])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
