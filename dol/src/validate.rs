use std::ops::Range;

use thiserror::Error;
use tracing::debug;

use crate::{header::Header, layout::LoadSection};

/// Start of the memory every section must be loaded into.
pub const LOAD_START: u32 = 0x8000_0000;
/// End (exclusive) of the memory every section must be loaded into.
pub const LOAD_END: u32 = 0x8180_0000;

/// A rule a header broke.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("no text section")]
    NoTextSection,
    #[error("{section} extends past the end of the file ({end:#x} > {file_size:#x})")]
    OutsideFile {
        section: LoadSection,
        end: u64,
        file_size: u64,
    },
    #[error("{section} is not loaded within {:#x}..{:#x}", LOAD_START, LOAD_END)]
    OutOfRange { section: LoadSection },
    #[error("{first} overlaps {second} in the file")]
    FileOverlap {
        first: LoadSection,
        second: LoadSection,
    },
    #[error("{first} overlaps {second} in memory")]
    AddressOverlap {
        first: LoadSection,
        second: LoadSection,
    },
    #[error("entrypoint {entrypoint:#x} is not in any text section")]
    EntrypointOutsideText { entrypoint: u32 },
}

/// Whether `header` describes an image that can be loaded from a file of `file_size` bytes.
pub fn validate(header: &Header, file_size: u64) -> bool {
    check(header, file_size).is_ok()
}

/// Like [`validate`], but says which rule failed.
pub fn check(header: &Header, file_size: u64) -> Result<(), LayoutError> {
    match violations(header, file_size).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every rule `header` breaks, in no particular order.
pub fn violations(header: &Header, file_size: u64) -> Vec<LayoutError> {
    let all: Vec<LoadSection> = header.load_sections().collect();
    let initialized: Vec<LoadSection> = all
        .iter()
        .filter(|section| section.file_offset.is_some())
        .copied()
        .collect();

    let mut errors = Vec::new();

    if header.text_sections().is_empty() {
        errors.push(LayoutError::NoTextSection);
    }

    for section in &initialized {
        let end = file_range(section).end;
        if end > file_size {
            errors.push(LayoutError::OutsideFile {
                section: *section,
                end,
                file_size,
            });
        }
    }

    for section in &all {
        let in_range = section.address >= LOAD_START
            && section.address < LOAD_END
            && section.address_range().end <= LOAD_END as u64;
        if !in_range {
            errors.push(LayoutError::OutOfRange { section: *section });
        }
    }

    overlaps(initialized, file_range, &mut errors, |first, second| {
        LayoutError::FileOverlap { first, second }
    });
    overlaps(all, LoadSection::address_range, &mut errors, |first, second| {
        LayoutError::AddressOverlap { first, second }
    });

    let entrypoint = header.entrypoint();
    if !header.text_sections().iter().any(|s| s.contains_addr(entrypoint)) {
        errors.push(LayoutError::EntrypointOutsideText { entrypoint });
    }

    for err in &errors {
        debug!(%err, "rejecting dol layout");
    }

    errors
}

fn file_range(section: &LoadSection) -> Range<u64> {
    section.file_range().unwrap_or_default()
}

/// Sorts `sections` by where `range` puts them and reports each neighbouring pair that overlaps.
/// Touching is fine, including zero-sized sections.
fn overlaps(
    mut sections: Vec<LoadSection>,
    range: impl Fn(&LoadSection) -> Range<u64>,
    errors: &mut Vec<LayoutError>,
    error: impl Fn(LoadSection, LoadSection) -> LayoutError,
) {
    sections.sort_by_key(|section| range(section).start);

    for pair in sections.windows(2) {
        if range(&pair[0]).end > range(&pair[1]).start {
            errors.push(error(pair[0], pair[1]));
        }
    }
}
