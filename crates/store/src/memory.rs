//! In-memory [`TabularStore`] for tests.
//!
//! Models the behaviors the projector actually depends on: sparse grids,
//! trailing-blank trimming on reads, a hard column-capacity limit on
//! writes, and value-copying tab duplication. Also records enough state
//! (write counts, formatting ops) for tests to assert against, and can be
//! told to start failing writes partway through a sequence.

use crate::a1::{parse_range, RangeExpr};
use crate::store::{FormatOp, TabMeta, TabularStore};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Mutex;
use tallysheet_core::{TallyError, TallyResult};

const DEFAULT_COLUMN_CAPACITY: u32 = 26;

#[derive(Debug, Default)]
struct Tab {
    tab_id: i64,
    column_count: u32,
    /// Row-major, 0-based, sparse: rows and cells exist only once written.
    cells: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct Document {
    tabs: IndexMap<String, Tab>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: IndexMap<String, Document>,
    next_tab_id: i64,
    update_count: u32,
    write_count: u32,
    fail_updates_after: Option<u32>,
    fail_formats: bool,
    format_log: Vec<FormatOp>,
}

/// In-memory tabular store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty document.
    pub fn add_document(&self, doc: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.documents.entry(doc.to_string()).or_default();
    }

    /// Add a tab with the given initial rows. Returns its tab id.
    pub fn add_tab(&self, doc: &str, title: &str, rows: &[&[&str]]) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let tab_id = inner.next_tab_id;
        inner.next_tab_id += 1;
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect();
        let widest = cells.iter().map(Vec::len).max().unwrap_or(0) as u32;
        inner.documents.entry(doc.to_string()).or_default().tabs.insert(
            title.to_string(),
            Tab {
                tab_id,
                column_count: DEFAULT_COLUMN_CAPACITY.max(widest),
                cells,
            },
        );
        tab_id
    }

    /// Read one cell by A1 reference, blank if never written.
    pub fn cell(&self, doc: &str, tab: &str, cell_ref: &str) -> String {
        let Ok(RangeExpr::Cell { col, row }) = parse_range(cell_ref) else {
            return String::new();
        };
        let inner = self.inner.lock().unwrap();
        inner
            .documents
            .get(doc)
            .and_then(|d| d.tabs.get(tab))
            .and_then(|t| t.cells.get(row as usize - 1))
            .and_then(|r| r.get(col as usize - 1))
            .cloned()
            .unwrap_or_default()
    }

    /// All values of one 1-based column, without trailing blanks.
    pub fn column_values(&self, doc: &str, tab: &str, col: u32) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        let Some(tab) = inner.documents.get(doc).and_then(|d| d.tabs.get(tab)) else {
            return Vec::new();
        };
        let mut values: Vec<String> = tab
            .cells
            .iter()
            .map(|row| row.get(col as usize - 1).cloned().unwrap_or_default())
            .collect();
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        values
    }

    /// Tab titles of a document, in creation order.
    pub fn tab_names(&self, doc: &str) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .documents
            .get(doc)
            .map(|d| d.tabs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of value/structure writes issued so far (updates, duplicates,
    /// column appends; formatting excluded).
    pub fn write_count(&self) -> u32 {
        self.inner.lock().unwrap().write_count
    }

    /// All formatting ops applied so far.
    pub fn format_ops(&self) -> Vec<FormatOp> {
        self.inner.lock().unwrap().format_log.clone()
    }

    /// Let `n` more updates succeed, then fail every one after.
    pub fn fail_updates_after(&self, n: u32) {
        self.inner.lock().unwrap().fail_updates_after = Some(n);
    }

    /// Make `batch_format` fail.
    pub fn fail_formats(&self) {
        self.inner.lock().unwrap().fail_formats = true;
    }
}

impl Inner {
    fn tab(&self, doc: &str, tab: &str) -> TallyResult<&Tab> {
        self.documents
            .get(doc)
            .ok_or_else(|| TallyError::Store(format!("document not found: {doc}")))?
            .tabs
            .get(tab)
            .ok_or_else(|| TallyError::Store(format!("tab not found: {tab}")))
    }

    fn tab_mut(&mut self, doc: &str, tab: &str) -> TallyResult<&mut Tab> {
        self.documents
            .get_mut(doc)
            .ok_or_else(|| TallyError::Store(format!("document not found: {doc}")))?
            .tabs
            .get_mut(tab)
            .ok_or_else(|| TallyError::Store(format!("tab not found: {tab}")))
    }
}

impl Tab {
    fn cell_at(&self, row: u32, col: u32) -> &str {
        self.cells
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
            .map_or("", String::as_str)
    }

    fn last_row(&self) -> u32 {
        self.cells.len() as u32
    }

    fn last_col(&self) -> u32 {
        self.cells.iter().map(|r| r.len() as u32).max().unwrap_or(0)
    }

    fn set(&mut self, row: u32, col: u32, value: String) {
        let row = row as usize - 1;
        let col = col as usize - 1;
        if self.cells.len() <= row {
            self.cells.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.cells[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value;
    }
}

/// Drop trailing blank cells of each row, then trailing empty rows.
fn trim_grid(mut grid: Vec<Vec<String>>) -> Vec<Vec<String>> {
    for row in &mut grid {
        while row.last().is_some_and(|v| v.is_empty()) {
            row.pop();
        }
    }
    while grid.last().is_some_and(Vec::is_empty) {
        grid.pop();
    }
    grid
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn get_values(&self, doc: &str, tab: &str, range: &str) -> TallyResult<Vec<Vec<String>>> {
        let inner = self.inner.lock().unwrap();
        let tab = inner.tab(doc, tab)?;
        let (start_col, start_row, end_col, end_row) = match parse_range(range)? {
            RangeExpr::Cell { col, row } => (col, row, col, row),
            RangeExpr::Rect {
                start_col,
                start_row,
                end_col,
                end_row,
            } => (start_col, start_row, end_col, end_row),
            RangeExpr::Cols { start, end } => (start, 1, end, tab.last_row().max(1)),
            RangeExpr::Rows { start, end } => (1, start, tab.last_col().max(1), end),
        };

        let mut grid = Vec::new();
        for row in start_row..=end_row {
            let mut cells = Vec::new();
            for col in start_col..=end_col {
                cells.push(tab.cell_at(row, col).to_string());
            }
            grid.push(cells);
        }
        Ok(trim_grid(grid))
    }

    async fn update_values(
        &self,
        doc: &str,
        tab: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> TallyResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.update_count += 1;
        if let Some(allowed) = inner.fail_updates_after {
            if inner.update_count > allowed {
                return Err(TallyError::store("injected update failure"));
            }
        }
        inner.write_count += 1;

        let (start_col, start_row) = match parse_range(range)? {
            RangeExpr::Cell { col, row } => (col, row),
            RangeExpr::Rect {
                start_col, start_row, ..
            } => (start_col, start_row),
            RangeExpr::Cols { start, .. } => (start, 1),
            RangeExpr::Rows { start, .. } => (1, start),
        };

        let capacity = inner.tab(doc, tab)?.column_count;
        let widest = values.iter().map(Vec::len).max().unwrap_or(0) as u32;
        if start_col + widest.saturating_sub(1) > capacity {
            return Err(TallyError::Store(format!(
                "range {range} exceeds grid limits ({capacity} columns)"
            )));
        }

        let tab = inner.tab_mut(doc, tab)?;
        for (r, row_values) in values.into_iter().enumerate() {
            for (c, value) in row_values.into_iter().enumerate() {
                tab.set(start_row + r as u32, start_col + c as u32, value);
            }
        }
        Ok(())
    }

    async fn sheet_metadata(&self, doc: &str) -> TallyResult<Vec<TabMeta>> {
        let inner = self.inner.lock().unwrap();
        let document = inner
            .documents
            .get(doc)
            .ok_or_else(|| TallyError::Store(format!("document not found: {doc}")))?;
        Ok(document
            .tabs
            .iter()
            .map(|(title, tab)| TabMeta {
                title: title.clone(),
                tab_id: tab.tab_id,
                column_count: tab.column_count,
            })
            .collect())
    }

    async fn duplicate_tab(&self, doc: &str, source_tab_id: i64, new_name: &str) -> TallyResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_count += 1;
        let tab_id = inner.next_tab_id;
        inner.next_tab_id += 1;

        let document = inner
            .documents
            .get_mut(doc)
            .ok_or_else(|| TallyError::Store(format!("document not found: {doc}")))?;
        if document.tabs.contains_key(new_name) {
            return Err(TallyError::Store(format!("tab already exists: {new_name}")));
        }
        let source = document
            .tabs
            .values()
            .find(|t| t.tab_id == source_tab_id)
            .ok_or_else(|| TallyError::Store(format!("tab id not found: {source_tab_id}")))?;
        let copy = Tab {
            tab_id,
            column_count: source.column_count,
            cells: source.cells.clone(),
        };
        document.tabs.insert(new_name.to_string(), copy);
        Ok(())
    }

    async fn append_columns(&self, doc: &str, tab_id: i64, count: u32) -> TallyResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_count += 1;
        let document = inner
            .documents
            .get_mut(doc)
            .ok_or_else(|| TallyError::Store(format!("document not found: {doc}")))?;
        let tab = document
            .tabs
            .values_mut()
            .find(|t| t.tab_id == tab_id)
            .ok_or_else(|| TallyError::Store(format!("tab id not found: {tab_id}")))?;
        tab.column_count += count;
        Ok(())
    }

    async fn batch_format(&self, _doc: &str, ops: Vec<FormatOp>) -> TallyResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_formats {
            return Err(TallyError::store("injected format failure"));
        }
        inner.format_log.extend(ops);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_write_round_trip() {
        let store = MemoryStore::new();
        store.add_tab("doc", "Sheet1", &[&["Item"], &[], &[], &[], &[], &["Tomato"]]);

        store
            .update_values("doc", "Sheet1", "B1", vec![vec!["2024-05-01".to_string()]])
            .await
            .unwrap();
        assert_eq!(store.cell("doc", "Sheet1", "B1"), "2024-05-01");

        let col_a = store.get_values("doc", "Sheet1", "A:A").await.unwrap();
        assert_eq!(col_a.len(), 6);
        assert_eq!(col_a[0], vec!["Item"]);
        assert!(col_a[1].is_empty());
        assert_eq!(col_a[5], vec!["Tomato"]);
    }

    #[tokio::test]
    async fn header_row_read_trims_trailing_blanks() {
        let store = MemoryStore::new();
        store.add_tab("doc", "Sheet1", &[&["Item", "", "2024-05-01"]]);
        let row = store.get_values("doc", "Sheet1", "1:1").await.unwrap();
        assert_eq!(row, vec![vec!["Item".to_string(), String::new(), "2024-05-01".to_string()]]);
    }

    #[tokio::test]
    async fn write_beyond_capacity_fails() {
        let store = MemoryStore::new();
        store.add_tab("doc", "Sheet1", &[&["Item"]]);
        let err = store
            .update_values("doc", "Sheet1", "AA1", vec![vec!["x".to_string()]])
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Store(_)));

        let meta = store.sheet_metadata("doc").await.unwrap();
        store.append_columns("doc", meta[0].tab_id, 1).await.unwrap();
        store
            .update_values("doc", "Sheet1", "AA1", vec![vec!["x".to_string()]])
            .await
            .unwrap();
        assert_eq!(store.cell("doc", "Sheet1", "AA1"), "x");
    }

    #[tokio::test]
    async fn duplicate_copies_values() {
        let store = MemoryStore::new();
        let template_id = store.add_tab("doc", "Template", &[&["Item"], &["Tomato"]]);
        store.duplicate_tab("doc", template_id, "Outlet").await.unwrap();

        assert_eq!(store.tab_names("doc"), vec!["Template", "Outlet"]);
        assert_eq!(store.cell("doc", "Outlet", "A2"), "Tomato");
    }

    #[tokio::test]
    async fn missing_tab_errors() {
        let store = MemoryStore::new();
        store.add_document("doc");
        let err = store.get_values("doc", "Nope", "A:A").await.unwrap_err();
        assert!(matches!(err, TallyError::Store(_)));
    }
}
