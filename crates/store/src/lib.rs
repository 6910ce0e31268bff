//! # tallysheet-store
//!
//! The tabular-store seam: the capability trait the projector writes
//! through, spreadsheet-style column/range addressing helpers, and an
//! in-memory store used by tests.

/// Column-letter and range-expression helpers.
pub mod a1;
/// In-memory [`TabularStore`] implementation.
pub mod memory;
/// The capability trait and its supporting types.
pub mod store;

pub use a1::{column_letter, column_number, parse_range, RangeExpr};
pub use memory::MemoryStore;
pub use store::{FormatOp, TabMeta, TabularStore};
