//! The projector: takes a validated report and writes it into the
//! merchandiser's spreadsheet as one append-only column block.
//!
//! The write sequence is strictly ordered (date header first, so a
//! half-written block is still attributable to a submission date) and
//! fail-fast: no step runs after an earlier one errored. Cosmetic
//! formatting goes out last, batched, and is best-effort only.

use crate::alloc::{ensure_capacity, next_block, WriteBlock};
use crate::index::{reconcile, RowIndex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tallysheet_core::{ProjectorConfig, Report, ReportItem, TallyError, TallyResult};
use tallysheet_store::{column_letter, FormatOp, TabMeta, TabularStore};

/// Background color for block header cells (RGB hex, no '#').
const HEADER_BACKGROUND: &str = "FFF3CC";
/// Row height for the submission-notes row, enough for wrapped text.
const NOTES_ROW_HEIGHT: u32 = 60;

/// What a successful projection did, for logging and tests.
#[derive(Debug, Clone)]
pub struct ProjectionSummary {
    /// Resolved tab title (the trimmed outlet name).
    pub tab: String,
    /// How many submitted items matched a row.
    pub matched: usize,
    /// The column block this submission occupied.
    pub block: WriteBlock,
}

/// Projects reports into spreadsheet documents through a [`TabularStore`].
///
/// Holds a per-(document, tab) async mutex so concurrent submissions to
/// the same tab cannot race on column allocation.
pub struct Projector {
    config: ProjectorConfig,
    store: Arc<dyn TabularStore>,
    locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl Projector {
    #[must_use]
    pub fn new(config: ProjectorConfig, store: Arc<dyn TabularStore>) -> Self {
        Self {
            config,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Project one report into its merchandiser's document.
    ///
    /// # Errors
    ///
    /// - [`TallyError::UnknownMerchandiser`] on a registry miss (checked
    ///   before any store call)
    /// - [`TallyError::TemplateMissing`] when a new tab is needed but the
    ///   template is gone
    /// - [`TallyError::NoItemsMatched`] when no submitted item name matches
    ///   the tab's item column
    /// - [`TallyError::Store`] on store failures; writes already issued are
    ///   not rolled back
    pub async fn append_report(&self, report: &Report) -> TallyResult<ProjectionSummary> {
        let doc = self.config.document_for(&report.merchandiser)?.to_string();
        let outlet = report.outlet.trim().to_string();

        // Serialize allocation + writes per tab; two concurrent reports to
        // the same tab would otherwise both claim the same block.
        let lock = self.tab_lock(&doc, &outlet);
        let _guard = lock.lock().await;

        let tab = self.ensure_tab(&doc, &outlet).await?;
        let index = reconcile(self.store.as_ref(), &doc, &tab.title, &self.config.template_tab).await?;
        let matched = match_items(&index, &report.items)?;

        let block = next_block(
            self.store.as_ref(),
            &doc,
            &tab.title,
            report.has_item_notes(),
        )
        .await?;
        ensure_capacity(self.store.as_ref(), &doc, &tab, block).await?;

        self.write_block(&doc, &tab.title, report, &index, &matched, block)
            .await?;
        self.apply_formatting(&doc, &tab, report, &index, block).await;

        tracing::info!(
            merchandiser = %report.merchandiser,
            tab = %tab.title,
            matched = matched.len(),
            qty_col = %column_letter(block.qty_col),
            "report appended"
        );

        Ok(ProjectionSummary {
            tab: tab.title,
            matched: matched.len(),
            block,
        })
    }

    fn tab_lock(&self, doc: &str, tab: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry((doc.to_string(), tab.to_string()))
            .or_default()
            .clone()
    }

    /// Return the outlet's tab, duplicating the template when it does not
    /// exist yet. Match is by exact trimmed name.
    async fn ensure_tab(&self, doc: &str, outlet: &str) -> TallyResult<TabMeta> {
        let tabs = self.store.sheet_metadata(doc).await?;
        if let Some(meta) = tabs.iter().find(|t| t.title == outlet) {
            return Ok(meta.clone());
        }

        let template = tabs
            .iter()
            .find(|t| t.title == self.config.template_tab)
            .ok_or_else(|| TallyError::TemplateMissing(self.config.template_tab.clone()))?;
        self.store.duplicate_tab(doc, template.tab_id, outlet).await?;
        tracing::info!(outlet, template = %self.config.template_tab, "created outlet tab from template");

        self.store
            .sheet_metadata(doc)
            .await?
            .into_iter()
            .find(|t| t.title == outlet)
            .ok_or_else(|| TallyError::Store(format!("tab \"{outlet}\" missing after duplication")))
    }

    /// The six-step value-write sequence. Ordering matters: later steps
    /// assume the earlier headers exist, and each step only runs if every
    /// one before it succeeded.
    async fn write_block(
        &self,
        doc: &str,
        tab: &str,
        report: &Report,
        index: &RowIndex,
        matched: &[(u32, &ReportItem)],
        block: WriteBlock,
    ) -> TallyResult<()> {
        let qty = column_letter(block.qty_col);
        let expiry = column_letter(block.expiry_col);
        let start = self.config.data_start_row;
        let end = index.last_row();

        // 1. Submission date is the block's identity.
        self.write_cell(doc, tab, &qty, 1, report.date.clone()).await?;

        // 2. Submission-level notes live in row 2 of the qty column; an
        //    already-present value wins over a resubmission.
        if block.notes_col.is_none() {
            let notes = self.resolve_notes(doc, tab, &qty, report.notes.as_deref()).await?;
            self.write_cell(doc, tab, &qty, 2, notes).await?;
        }

        // 3. Quantities over the whole data range, unmatched rows blank.
        if end >= start {
            let values = fill_rows(start, end, matched, |item| item.qty.to_string());
            self.write_column(doc, tab, &qty, start, end, values).await?;
        }

        // 4 + 5. Expiry header, then expiry values.
        self.write_cell(doc, tab, &expiry, 1, "Expiry".to_string()).await?;
        if end >= start {
            let values = fill_rows(start, end, matched, |item| item.expiry.clone());
            self.write_column(doc, tab, &expiry, start, end, values).await?;
        }

        // 6. Per-item notes, when this submission carries them.
        if let Some(col) = block.notes_col {
            let notes = column_letter(col);
            self.write_cell(doc, tab, &notes, 1, "Notes".to_string()).await?;
            if end >= start {
                let values =
                    fill_rows(start, end, matched, |item| item.notes.clone().unwrap_or_default());
                self.write_column(doc, tab, &notes, start, end, values).await?;
            }
        }

        Ok(())
    }

    /// Existing row-2 notes win; otherwise the submitted notes; otherwise
    /// the configured placeholder.
    async fn resolve_notes(
        &self,
        doc: &str,
        tab: &str,
        qty_col: &str,
        submitted: Option<&str>,
    ) -> TallyResult<String> {
        let cell = format!("{qty_col}2");
        let existing = self.store.get_values(doc, tab, &cell).await?;
        if let Some(value) = existing.first().and_then(|r| r.first()) {
            if !value.trim().is_empty() {
                return Ok(value.clone());
            }
        }
        Ok(submitted
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.config.notes_placeholder)
            .to_string())
    }

    async fn write_cell(
        &self,
        doc: &str,
        tab: &str,
        col: &str,
        row: u32,
        value: String,
    ) -> TallyResult<()> {
        let range = format!("{col}{row}");
        self.store.update_values(doc, tab, &range, vec![vec![value]]).await
    }

    async fn write_column(
        &self,
        doc: &str,
        tab: &str,
        col: &str,
        start: u32,
        end: u32,
        values: Vec<Vec<String>>,
    ) -> TallyResult<()> {
        let range = format!("{col}{start}:{col}{end}");
        self.store.update_values(doc, tab, &range, values).await
    }

    /// Cosmetic formatting, batched into one request after all value
    /// writes. Failure here never fails the submission.
    async fn apply_formatting(
        &self,
        doc: &str,
        tab: &TabMeta,
        report: &Report,
        index: &RowIndex,
        block: WriteBlock,
    ) {
        let mut ops = vec![
            FormatOp::HeaderStyle {
                tab_id: tab.tab_id,
                row: 1,
                start_col: block.qty_col,
                end_col: block.last_col(),
                background: HEADER_BACKGROUND.to_string(),
            },
            FormatOp::CellNote {
                tab_id: tab.tab_id,
                row: 1,
                col: block.qty_col,
                note: format!("Submitted by {}", report.merchandiser),
            },
        ];
        if block.notes_col.is_none() {
            ops.push(FormatOp::TextWrap {
                tab_id: tab.tab_id,
                start_row: 2,
                end_row: 2,
                start_col: block.qty_col,
                end_col: block.qty_col,
            });
            ops.push(FormatOp::RowHeight {
                tab_id: tab.tab_id,
                row: 2,
                pixels: NOTES_ROW_HEIGHT,
            });
        } else if index.last_row() >= self.config.data_start_row {
            ops.push(FormatOp::TextWrap {
                tab_id: tab.tab_id,
                start_row: self.config.data_start_row,
                end_row: index.last_row(),
                start_col: block.last_col(),
                end_col: block.last_col(),
            });
        }

        if let Err(err) = self.store.batch_format(doc, ops).await {
            tracing::warn!(tab = %tab.title, error = %err, "formatting failed after values were written");
        }
    }
}

/// Subset of items whose normalized name is a row-index key, each with its
/// target row. Duplicates are kept; when two share a row the later one's
/// write wins. Zero matches is a hard failure.
fn match_items<'a>(
    index: &RowIndex,
    items: &'a [ReportItem],
) -> TallyResult<Vec<(u32, &'a ReportItem)>> {
    let matched: Vec<_> = items
        .iter()
        .filter_map(|item| index.row_of(&item.normalized_name()).map(|row| (row, item)))
        .collect();
    if matched.is_empty() {
        return Err(TallyError::NoItemsMatched);
    }
    for (row, item) in &matched {
        tracing::debug!(name = %item.name, qty = item.qty, expiry = %item.expiry, row, "matched item");
    }
    Ok(matched)
}

/// One column of values covering rows `start..=end`: matched rows get the
/// projected field, every other row an explicit blank. Matched rows above
/// the data range are ignored.
fn fill_rows(
    start: u32,
    end: u32,
    matched: &[(u32, &ReportItem)],
    field: impl Fn(&ReportItem) -> String,
) -> Vec<Vec<String>> {
    let mut values = vec![vec![String::new()]; (end - start + 1) as usize];
    for (row, item) in matched {
        if *row >= start && *row <= end {
            values[(*row - start) as usize] = vec![field(item)];
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RowIndex;

    fn item(name: &str, qty: i64) -> ReportItem {
        ReportItem {
            name: name.to_string(),
            qty,
            expiry: String::new(),
            notes: None,
        }
    }

    fn index_of(names: &[&str]) -> RowIndex {
        let rows: Vec<Vec<String>> = names.iter().map(|n| vec![(*n).to_string()]).collect();
        RowIndex::from_rows(&rows)
    }

    #[test]
    fn zero_matches_is_an_error() {
        let index = index_of(&["Tomato"]);
        let items = vec![item("Cabbage", 1)];
        assert!(matches!(
            match_items(&index, &items),
            Err(TallyError::NoItemsMatched)
        ));

        let empty: Vec<ReportItem> = Vec::new();
        assert!(matches!(
            match_items(&index, &empty),
            Err(TallyError::NoItemsMatched)
        ));
    }

    #[test]
    fn matching_is_case_and_whitespace_insensitive() {
        let index = index_of(&["tomato"]);
        let items = vec![item("  Tomato ", 4)];
        let matched = match_items(&index, &items).unwrap();
        assert_eq!(matched, vec![(1, &items[0])]);
    }

    #[test]
    fn duplicate_submissions_all_retained() {
        let index = index_of(&["Tomato"]);
        let items = vec![item("Tomato", 1), item("tomato", 2)];
        let matched = match_items(&index, &items).unwrap();
        assert_eq!(matched.len(), 2);

        // Later duplicate wins the shared row.
        let values = fill_rows(1, 1, &matched, |i| i.qty.to_string());
        assert_eq!(values, vec![vec!["2".to_string()]]);
    }

    #[test]
    fn fill_rows_blanks_unmatched_and_skips_rows_above_range() {
        let index = index_of(&["Header", "", "", "", "", "Tomato", "Onion"]);
        let items = vec![item("Header", 9), item("Onion", 3)];
        let matched = match_items(&index, &items).unwrap();

        let values = fill_rows(6, 7, &matched, |i| i.qty.to_string());
        // Row 6 (tomato) blank, row 7 (onion) filled; the header match at
        // row 1 is outside the data range and dropped.
        assert_eq!(values, vec![vec![String::new()], vec!["3".to_string()]]);
    }
}
