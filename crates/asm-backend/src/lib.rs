//! Narrow trait boundary between the assembler core and pluggable
//! CPU/output back-ends.
//!
//! Every trait here is deliberately small: a back-end sees only the data it
//! needs (a candidate PC, an opaque operand it produced itself) and returns
//! only what the core needs back (a size, or an encoded byte block). No
//! trait in this crate has access to the core's section/symbol tables.

mod cpu;
mod data;
mod debuginfo;
mod error;
mod ids;
mod output;
mod reloc;

pub use cpu::{CpuBackend, SizeQuery};
pub use data::DataEvaluator;
pub use debuginfo::DebugInfoSink;
pub use error::BackendError;
pub use ids::{SectionId, SymbolId};
pub use output::{ObjectSection, ObjectSymbol, OutputWriter};
pub use reloc::{EncodedBlock, Reloc};
