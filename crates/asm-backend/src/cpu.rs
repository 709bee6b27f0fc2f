//! CPU back-end trait.
//!
//! A back-end never touches the section/symbol tables directly; it only
//! ever sees the narrow [`SizeQuery`] view the core hands it. Size queries
//! are pure: a back-end must not have observable side effects from
//! `instruction_size`, only from `eval_instruction` (final pass only) and
//! `apply_options` (mid-section `Opts` atoms).

use crate::{BackendError, EncodedBlock};

/// Read-only view of the section state a back-end needs to size or encode
/// an atom at a candidate program counter.
#[derive(Debug, Clone, Copy)]
pub struct SizeQuery {
    /// Candidate program counter for this atom.
    pub pc: i64,
    /// Whether the enclosing section is currently absolute (e.g. inside a
    /// `RORG` block).
    pub section_absolute: bool,
    /// Set when the atom has changed size more often than the resolver's
    /// oscillation threshold. A back-end should pick its most conservative
    /// (largest) encoding while this is set, to help the resolver converge.
    pub resolve_warn: bool,
}

/// A pluggable CPU instruction encoder.
///
/// `Instruction` is an opaque, back-end-defined operand representation
/// produced by the (out-of-scope) parser front-end; the core never
/// inspects its contents, only stores and replays it.
pub trait CpuBackend {
    /// Operand representation for one `Instruction` atom.
    type Instruction: Clone;
    /// Mid-section option record applied by `Opts` atoms (e.g. CPU variant,
    /// default branch width preference).
    type Options: Clone + Default;

    /// Natural alignment instructions must start on, in bytes.
    fn instruction_alignment(&self) -> u32 {
        1
    }

    /// Estimate the encoded size, in bytes, of `inst` at the candidate PC.
    ///
    /// Called on every resolver pass; must be pure with respect to any
    /// state outside of `self` and `query`.
    fn instruction_size(&self, inst: &Self::Instruction, query: SizeQuery) -> u64;

    /// Encode `inst` into its final byte block. Called exactly once per
    /// atom, during the final assembler pass.
    fn eval_instruction(
        &self,
        inst: &Self::Instruction,
        query: SizeQuery,
    ) -> Result<EncodedBlock, BackendError>;

    /// Apply a mid-section `Opts` atom. Visible to subsequent `instruction_size`
    /// and `eval_instruction` calls within the same section.
    fn apply_options(&mut self, opts: &Self::Options);
}
