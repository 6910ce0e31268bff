//! Projector configuration.
//!
//! The merchandiser registry, template-tab name, and layout constants are
//! business configuration, loaded once at startup and threaded into the
//! projector as an immutable value.

use crate::error::{TallyError, TallyResult};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Immutable projector configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectorConfig {
    /// Merchandiser identity -> spreadsheet document id.
    pub documents: IndexMap<String, String>,
    /// Tab whose column A defines the master item list.
    #[serde(default = "default_template_tab")]
    pub template_tab: String,
    /// First data row of a write block (row 1 is the block header).
    #[serde(default = "default_data_start_row")]
    pub data_start_row: u32,
    /// Written into row 2 of the quantity column when a submission carries
    /// no notes.
    #[serde(default = "default_notes_placeholder")]
    pub notes_placeholder: String,
}

fn default_template_tab() -> String {
    "Acacia".to_string()
}

fn default_data_start_row() -> u32 {
    6
}

fn default_notes_placeholder() -> String {
    "No notes".to_string()
}

impl ProjectorConfig {
    /// Load the configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> TallyResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Resolve the document id for a merchandiser.
    ///
    /// # Errors
    ///
    /// Returns [`TallyError::UnknownMerchandiser`] on a registry miss.
    pub fn document_for(&self, merchandiser: &str) -> TallyResult<&str> {
        self.documents
            .get(merchandiser)
            .map(String::as_str)
            .ok_or_else(|| TallyError::UnknownMerchandiser(merchandiser.to_string()))
    }
}
