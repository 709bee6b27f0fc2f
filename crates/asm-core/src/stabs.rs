//! Accumulated stab/nlist records (spec §4.8), collected during the final
//! pass and handed to a [`asm_backend::DebugInfoSink`] in source order.

/// One resolved nlist entry, mirroring the reference assembler's
/// `struct stabdef` but with the expression already folded to a value.
#[derive(Debug, Clone)]
pub struct StabDef {
    pub name: String,
    pub nlist_type: u8,
    pub other: u8,
    pub desc: i16,
    pub value: i64,
}
