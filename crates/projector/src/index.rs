//! Row-index reconciliation.
//!
//! A tab's column A is its item list: row r holds an item name, and the
//! index maps each normalized name to its 1-based row. A freshly created
//! (or manually emptied) tab is seeded by copying the template's column A
//! before indexing; once column A is non-blank it is never rewritten.

use indexmap::IndexMap;
use tallysheet_core::{normalize_name, TallyResult};
use tallysheet_store::TabularStore;

/// Mapping from normalized item name to 1-based row number.
#[derive(Debug, Clone, Default)]
pub struct RowIndex {
    map: IndexMap<String, u32>,
    last_row: u32,
}

impl RowIndex {
    /// Build the index from column-A rows, top to bottom. Blank cells are
    /// skipped. When the same normalized name appears on several rows the
    /// last occurrence wins; existing sheets rely on this.
    #[must_use]
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut map = IndexMap::new();
        for (i, row) in rows.iter().enumerate() {
            let name = row.first().map(|c| normalize_name(c)).unwrap_or_default();
            if !name.is_empty() {
                map.insert(name, i as u32 + 1);
            }
        }
        Self {
            map,
            last_row: rows.len() as u32,
        }
    }

    /// Row number for a normalized name, if present.
    #[must_use]
    pub fn row_of(&self, normalized: &str) -> Option<u32> {
        self.map.get(normalized).copied()
    }

    /// The last row covered by the item column (1-based).
    #[must_use]
    pub fn last_row(&self) -> u32 {
        self.last_row
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Read the tab's column A and build its [`RowIndex`], seeding the column
/// from the template when it is empty or all-blank. The seeding writes
/// values only and happens at most once per tab.
pub async fn reconcile(
    store: &dyn TabularStore,
    doc: &str,
    tab: &str,
    template_tab: &str,
) -> TallyResult<RowIndex> {
    let mut rows = store.get_values(doc, tab, "A:A").await?;

    let all_blank = rows
        .iter()
        .all(|row| row.first().is_none_or(|c| c.trim().is_empty()));
    if rows.is_empty() || all_blank {
        let template_rows = store.get_values(doc, template_tab, "A:A").await?;
        if !template_rows.is_empty() {
            tracing::debug!(tab, template_tab, rows = template_rows.len(), "seeding item column from template");
            let range = format!("A1:A{}", template_rows.len());
            store
                .update_values(doc, tab, &range, template_rows.clone())
                .await?;
            rows = template_rows;
        }
    }

    Ok(RowIndex::from_rows(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(values: &[&str]) -> Vec<Vec<String>> {
        values.iter().map(|v| vec![(*v).to_string()]).collect()
    }

    #[test]
    fn builds_one_based_rows() {
        let index = RowIndex::from_rows(&rows(&["Item", "", "", "", "", "Tomato", "Onion"]));
        assert_eq!(index.row_of("tomato"), Some(6));
        assert_eq!(index.row_of("onion"), Some(7));
        assert_eq!(index.row_of("item"), Some(1));
        assert_eq!(index.row_of("cabbage"), None);
        assert_eq!(index.last_row(), 7);
    }

    #[test]
    fn keys_are_normalized() {
        let index = RowIndex::from_rows(&rows(&["  Tomato "]));
        assert_eq!(index.row_of("tomato"), Some(1));
    }

    #[test]
    fn duplicate_names_last_occurrence_wins() {
        let index = RowIndex::from_rows(&rows(&["Tomato", "Onion", "tomato"]));
        assert_eq!(index.row_of("tomato"), Some(3));
    }

    #[test]
    fn empty_rows_give_empty_index() {
        let index = RowIndex::from_rows(&[]);
        assert!(index.is_empty());
        assert_eq!(index.last_row(), 0);
    }
}
