//! Error types for tallysheet.

use thiserror::Error;

/// Result type for tallysheet operations.
pub type TallyResult<T> = Result<T, TallyError>;

/// Errors that can occur while projecting a report.
#[derive(Debug, Error)]
pub enum TallyError {
    /// No spreadsheet document is registered for the merchandiser.
    #[error("Spreadsheet not found for merchandiser: {0}")]
    UnknownMerchandiser(String),

    /// The template tab is missing from the merchandiser's document.
    #[error("Template tab \"{0}\" not found")]
    TemplateMissing(String),

    /// The inbound payload failed shape validation.
    #[error("Invalid payload: {0}")]
    Validation(String),

    /// No submitted item name matched any row of the sheet's item column.
    #[error("None of the submitted items matched the sheet items")]
    NoItemsMatched,

    /// The external tabular store failed a read or write.
    #[error("Store error: {0}")]
    Store(String),

    /// I/O error (configuration loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TallyError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Whether the error is the caller's fault (maps to HTTP 400).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
