//! DWARF line-info collector boundary.
//!
//! The core only decides *when* to call this; byte-level DWARF section
//! construction is entirely the collaborator's responsibility.
pub trait DebugInfoSink {
    /// Record a line entry for the current PC in `section`.
    fn line(&mut self, section: &str, src_file_index: u32, line: u32);

    /// Emit an end-of-sequence marker at the end of a section's atoms.
    fn end_sequence(&mut self, section: &str);

    /// Finalise the compilation unit at the end of assembly.
    fn finish(&mut self);
}
