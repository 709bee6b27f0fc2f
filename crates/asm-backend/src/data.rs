//! Data-definition evaluator trait (`dc.b`/`dc.w`-style directives).

use crate::{BackendError, EncodedBlock, SizeQuery};

/// A pluggable evaluator for `DataDef` atoms.
///
/// Distinct from [`crate::CpuBackend`] because data definitions are
/// evaluated by the syntax/data module in the original, not the CPU module;
/// keeping the two traits separate lets a back-end crate implement only the
/// one it needs (a data-only front end never needs `CpuBackend`).
pub trait DataEvaluator {
    /// Operand representation for one `DataDef` atom (e.g. a constant-folded
    /// expression list).
    type Operand: Clone;

    /// Size, in bytes, of `op` encoded at `bitsize` bits per element.
    fn data_size(&self, op: &Self::Operand, bitsize: u8, query: SizeQuery) -> u64;

    /// Encode `op` into its final byte block.
    fn eval_data(
        &self,
        op: &Self::Operand,
        bitsize: u8,
        query: SizeQuery,
    ) -> Result<EncodedBlock, BackendError>;
}
