//! Atom model (spec §3, §4.2).
//!
//! Atoms are the unit the resolver and final assembler walk. Each section
//! holds its atoms in declaration order in a `Vec`; an atom's identity is
//! its `(SectionId, usize)` position rather than a pointer, so symbols and
//! listing rows refer to atoms by that pair.

use crate::expr::Expr;
use asm_backend::{Reloc, SymbolId};

/// Source location an atom was created from, kept for diagnostics and
/// listing output.
#[derive(Debug, Clone, Copy)]
pub struct SourcePos {
    pub file: u32,
    pub line: u32,
}

/// A reserved but unwritten block of bytes (`.space`/`.ds`-style directives).
#[derive(Debug, Clone)]
pub struct SpaceBlock {
    pub size: Expr,
    pub fill: Option<i64>,
}

/// A deferred `.assert` check, evaluated once operands are fully resolved.
#[derive(Debug, Clone)]
pub struct AssertRecord {
    pub condition: Expr,
    pub message: Option<String>,
}

/// A deferred stab/nlist record (spec §4.8), accumulated during the final
/// pass and handed to a [`asm_backend::DebugInfoSink`] wholesale.
#[derive(Debug, Clone)]
pub struct NlistRecord {
    pub name: String,
    pub nlist_type: u8,
    pub other: u8,
    pub desc: i16,
    pub value: Expr,
}

/// The payload distinguishing one atom variant from another.
///
/// Deliberately a closed enum rather than a trait object: the resolver and
/// final assembler match on every variant exhaustively, and a new atom kind
/// is a deliberate, compile-checked extension rather than a silent gap.
#[derive(Debug)]
pub enum AtomPayload<I, Op, Opt> {
    /// A label definition pinned to the atom's position (zero-size).
    Label(SymbolId),
    /// A backend-opaque instruction, sized and encoded through
    /// [`asm_backend::CpuBackend`].
    Instruction(I),
    /// A backend-opaque data item, sized and encoded through
    /// [`asm_backend::DataEvaluator`].
    DataDef(Op, u8),
    /// Already-resolved literal bytes (the result of a resolved
    /// `Instruction`/`DataDef`, or front-end-supplied raw data).
    Data(Vec<u8>),
    /// A reserved-but-unwritten block.
    Space(SpaceBlock),
    /// `.roffs <expr>`: reserve bytes up to an absolute offset.
    Roffs(Expr),
    /// Enter a `RORG <expr>` block.
    Rorg(Expr),
    /// Close the active `RORG` block.
    RorgEnd,
    /// Apply backend options (`.option`-style directives) from this point.
    Opts(Opt),
    /// Emit literal text into the listing (`.print`).
    PrintText(String),
    /// Emit an expression's resolved value into the listing.
    PrintExpr(Expr),
    /// A deferred `.assert`.
    Assert(AssertRecord),
    /// A deferred stab/nlist record.
    Nlist(NlistRecord),
}

/// One atom: a payload plus the bookkeeping the resolver needs to converge.
pub struct Atom<I, Op, Opt> {
    pub src: SourcePos,
    /// Alignment required *before* this atom (0/1 = none).
    pub align: u32,
    /// Size (bytes) this atom occupied on the previous pass; `None` before
    /// the first pass has run.
    pub lastsize: Option<u64>,
    /// Count of passes in which this atom's size changed, used to detect
    /// oscillation (spec §4.3, `MAXSIZECHANGES`).
    pub changes: u32,
    pub payload: AtomPayload<I, Op, Opt>,
    /// Relocations emitted for this atom by the final pass. Empty until an
    /// `Instruction`/`DataDef` is resolved to `Data`.
    pub relocs: Vec<Reloc>,
    /// Absolute address this atom ended up at, filled in by the final pass.
    pub resolved_pc: i64,
}

impl<I, Op, Opt> Atom<I, Op, Opt> {
    #[must_use]
    pub fn new(src: SourcePos, align: u32, payload: AtomPayload<I, Op, Opt>) -> Self {
        Self {
            src,
            align,
            lastsize: None,
            changes: 0,
            payload,
            relocs: Vec::new(),
            resolved_pc: 0,
        }
    }

    /// `true` for atoms the final assembler must still turn into bytes
    /// (spec §8 type-monotonicity invariant: none of these survive the
    /// final pass).
    #[must_use]
    pub fn is_unresolved_code(&self) -> bool {
        matches!(
            self.payload,
            AtomPayload::Instruction(_) | AtomPayload::DataDef(_, _)
        )
    }
}
