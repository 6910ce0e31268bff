//! The capability trait the projector requires of a tabular store.
//!
//! The store is an opaque remote document made of named tabs; cells are
//! addressed by tab + range expression. Writes are plain overwrites.

use async_trait::async_trait;
use tallysheet_core::TallyResult;

/// Metadata for one tab of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabMeta {
    pub title: String,
    pub tab_id: i64,
    /// Grid capacity; writes beyond it fail until columns are appended.
    pub column_count: u32,
}

/// One cosmetic formatting operation. Carried as data so a whole
/// submission's formatting goes out as a single batched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOp {
    /// Bold text on a background color, for block headers.
    HeaderStyle {
        tab_id: i64,
        row: u32,
        start_col: u32,
        end_col: u32,
        /// RGB hex without the leading '#'.
        background: String,
    },
    /// Wrap text within a cell rectangle.
    TextWrap {
        tab_id: i64,
        start_row: u32,
        end_row: u32,
        start_col: u32,
        end_col: u32,
    },
    /// Fixed pixel height for one row.
    RowHeight { tab_id: i64, row: u32, pixels: u32 },
    /// Attach an annotation to a single cell.
    CellNote {
        tab_id: i64,
        row: u32,
        col: u32,
        note: String,
    },
}

/// Capabilities the projector needs from the external tabular store.
///
/// Implementations: [`crate::MemoryStore`] for tests, the Sheets client in
/// `tallysheet-gsheets` for production.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read a range of cell values. Trailing all-blank rows and trailing
    /// blank cells within a row may be omitted, as remote stores do.
    async fn get_values(&self, doc: &str, tab: &str, range: &str) -> TallyResult<Vec<Vec<String>>>;

    /// Overwrite a range with the given row-major values.
    async fn update_values(
        &self,
        doc: &str,
        tab: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> TallyResult<()>;

    /// List the document's tabs.
    async fn sheet_metadata(&self, doc: &str) -> TallyResult<Vec<TabMeta>>;

    /// Duplicate an existing tab (values and capacity) under a new name.
    async fn duplicate_tab(&self, doc: &str, source_tab_id: i64, new_name: &str) -> TallyResult<()>;

    /// Grow a tab's column capacity by `count`.
    async fn append_columns(&self, doc: &str, tab_id: i64, count: u32) -> TallyResult<()>;

    /// Apply cosmetic formatting as one batched request.
    async fn batch_format(&self, doc: &str, ops: Vec<FormatOp>) -> TallyResult<()>;
}
