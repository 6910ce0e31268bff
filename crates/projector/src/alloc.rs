//! Column allocation.
//!
//! Every submission gets its own block of columns, placed one past the
//! last non-blank header cell in row 1. Blocks are append-only: they are
//! never reused and never overlap earlier submissions.

use tallysheet_core::TallyResult;
use tallysheet_store::{TabMeta, TabularStore};

/// The columns allocated to one submission (all 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBlock {
    pub qty_col: u32,
    pub expiry_col: u32,
    /// Present only when the submission carries per-item notes.
    pub notes_col: Option<u32>,
}

impl WriteBlock {
    /// Rightmost column of the block.
    #[must_use]
    pub fn last_col(&self) -> u32 {
        self.notes_col.unwrap_or(self.expiry_col)
    }
}

/// Scan row 1 and allocate the next block at one past the last non-blank
/// header cell. Blank-but-formatted cells read back as empty strings and
/// do not count.
pub async fn next_block(
    store: &dyn TabularStore,
    doc: &str,
    tab: &str,
    with_notes: bool,
) -> TallyResult<WriteBlock> {
    let grid = store.get_values(doc, tab, "1:1").await?;
    let header = grid.first().map(Vec::as_slice).unwrap_or(&[]);

    let mut last_used = 0;
    for (i, cell) in header.iter().enumerate() {
        if !cell.trim().is_empty() {
            last_used = i as u32 + 1;
        }
    }

    let qty_col = last_used + 1;
    Ok(WriteBlock {
        qty_col,
        expiry_col: qty_col + 1,
        notes_col: with_notes.then_some(qty_col + 2),
    })
}

/// Grow the tab's column capacity to fit the block, by exactly the
/// shortfall. Never shrinks.
pub async fn ensure_capacity(
    store: &dyn TabularStore,
    doc: &str,
    tab: &TabMeta,
    block: WriteBlock,
) -> TallyResult<()> {
    let needed = block.last_col();
    if needed > tab.column_count {
        let shortfall = needed - tab.column_count;
        tracing::debug!(tab = %tab.title, shortfall, "expanding column capacity");
        store.append_columns(doc, tab.tab_id, shortfall).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallysheet_store::MemoryStore;

    #[tokio::test]
    async fn first_block_lands_after_existing_headers() {
        let store = MemoryStore::new();
        store.add_tab("doc", "Outlet", &[&["Item", "", "2024-05-01", "Expiry"]]);

        let block = next_block(&store, "doc", "Outlet", false).await.unwrap();
        assert_eq!(block.qty_col, 5);
        assert_eq!(block.expiry_col, 6);
        assert_eq!(block.notes_col, None);
        assert_eq!(block.last_col(), 6);
    }

    #[tokio::test]
    async fn empty_header_row_allocates_column_one() {
        let store = MemoryStore::new();
        store.add_tab("doc", "Outlet", &[]);

        let block = next_block(&store, "doc", "Outlet", true).await.unwrap();
        assert_eq!(block.qty_col, 1);
        assert_eq!(block.notes_col, Some(3));
    }

    #[tokio::test]
    async fn whitespace_headers_do_not_count() {
        let store = MemoryStore::new();
        store.add_tab("doc", "Outlet", &[&["Item", "  ", "   "]]);

        let block = next_block(&store, "doc", "Outlet", false).await.unwrap();
        assert_eq!(block.qty_col, 2);
    }

    #[tokio::test]
    async fn capacity_expands_by_exact_shortfall() {
        let store = MemoryStore::new();
        store.add_tab("doc", "Outlet", &[&["Item"]]);
        let meta = store.sheet_metadata("doc").await.unwrap().remove(0);
        assert_eq!(meta.column_count, 26);

        let block = WriteBlock {
            qty_col: 26,
            expiry_col: 27,
            notes_col: Some(28),
        };
        ensure_capacity(&store, "doc", &meta, block).await.unwrap();

        let meta = store.sheet_metadata("doc").await.unwrap().remove(0);
        assert_eq!(meta.column_count, 28);

        // Already big enough: no change.
        ensure_capacity(&store, "doc", &meta, block).await.unwrap();
        let meta = store.sheet_metadata("doc").await.unwrap().remove(0);
        assert_eq!(meta.column_count, 28);
    }
}
