//! # tallysheet-core
//!
//! Core types for tallysheet.
//!
//! This crate provides:
//! - The canonical report representation and the payload adapters that
//!   normalize both accepted wire shapes into it
//! - Error types
//! - Projector configuration

/// Projector configuration.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Report model and inbound payload adapters.
pub mod report;

pub use config::ProjectorConfig;
pub use error::{TallyError, TallyResult};
pub use report::{normalize_name, ItemsPayload, Report, ReportItem, ReportPayload};
