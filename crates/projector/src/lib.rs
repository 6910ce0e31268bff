//! # tallysheet-projector
//!
//! The projection engine. Given a validated [`Report`], it resolves the
//! outlet tab (creating it from the template on first use), reconciles the
//! submitted items against the tab's item column, allocates a fresh block
//! of columns, and writes the submission into it.
//!
//! The external spreadsheet is reached only through the
//! [`TabularStore`](tallysheet_store::TabularStore) trait, so the whole
//! engine runs against an in-memory store in tests.
//!
//! [`Report`]: tallysheet_core::Report

/// Column allocation for a submission's write block.
pub mod alloc;
/// Row-index reconciliation.
pub mod index;
/// The projector itself: bootstrap, matching, write sequencing.
pub mod project;

pub use alloc::WriteBlock;
pub use index::RowIndex;
pub use project::{ProjectionSummary, Projector};
