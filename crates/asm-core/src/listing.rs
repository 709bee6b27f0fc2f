//! Listing rows produced by the final pass (spec §4.4), consumed by an
//! external listing formatter — this crate only produces the data, never
//! renders it.

use asm_backend::SectionId;

/// One row of the eventual listing: an atom's resolved position plus the
/// diagnostic, if any, raised while assembling it.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub section: SectionId,
    pub atom_index: usize,
    pub pc: i64,
    pub line: u32,
    pub error_code: Option<u32>,
}
