//! Output object-file writer boundary.
//!
//! A writer never sees the core's live `Assembler<C, D>` (which is generic
//! over the back-end types); it only sees the flattened, back-end-agnostic
//! [`ObjectSection`]/[`ObjectSymbol`] view produced once assembly has
//! finished. This is what lets one registry of writers serve every CPU
//! back-end.

use crate::Reloc;
use std::io;

/// One allocated section's final bytes, ready for an output writer.
#[derive(Debug, Clone)]
pub struct ObjectSection<'a> {
    pub name: &'a str,
    pub attr: &'a str,
    pub org: i64,
    pub align: u32,
    pub data: &'a [u8],
    pub relocs: &'a [Reloc],
}

/// One symbol table entry, ready for an output writer.
#[derive(Debug, Clone)]
pub struct ObjectSymbol<'a> {
    pub name: &'a str,
    pub value: i64,
    pub section: Option<&'a str>,
    pub exported: bool,
    pub imported: bool,
    pub common: bool,
    pub weak: bool,
}

/// A pluggable object-file writer.
pub trait OutputWriter {
    /// Copyright/banner line printed by verbose driver runs.
    fn copyright(&self) -> &'static str;

    /// Handle one otherwise-unrecognised CLI argument. Returns `true` if
    /// consumed.
    fn handle_arg(&mut self, _arg: &str) -> bool {
        false
    }

    /// Write the final object file.
    fn write(
        &mut self,
        out: &mut dyn io::Write,
        sections: &[ObjectSection<'_>],
        symbols: &[ObjectSymbol<'_>],
    ) -> io::Result<()>;
}
