//! In-memory implementation of the row store gateway
//!
//! Rows live in an ordered map so prefix scans walk keys in the same
//! lexicographic order a wide-column store would. Clones share the same rows.

use crate::context::CallContext;
use crate::error::StoreError;
use crate::gateway::RowStoreGateway;
use crate::row::{Cell, Mutation, MutationOp, Row, RowFilter};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type Cells = BTreeMap<(String, String), Vec<u8>>;

/// Process-local row store
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    rows: Arc<RwLock<BTreeMap<String, Cells>>>,
}

impl MemoryRowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn to_row(key: &str, cells: &Cells, filter: &RowFilter) -> Option<Row> {
        let cells: Vec<Cell> = cells
            .iter()
            .filter(|((family, column), _)| filter.matches(family, column))
            .map(|((family, column), value)| Cell::new(family.as_str(), column.as_str(), value.clone()))
            .collect();
        if cells.is_empty() {
            None
        } else {
            Some(Row::new(key, cells))
        }
    }
}

impl RowStoreGateway for MemoryRowStore {
    async fn read_rows_by_prefix(
        &self,
        ctx: &CallContext,
        prefix: &str,
        filter: &RowFilter,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        ctx.check()?;
        debug!("Scanning rows with prefix '{}' (limit {})", prefix, limit);

        let rows = self.rows.read().await;
        let found: Vec<Row> = rows
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter_map(|(key, cells)| Self::to_row(key, cells, filter))
            .take(limit)
            .collect();

        Ok(found)
    }

    async fn read_row(
        &self,
        ctx: &CallContext,
        key: &str,
        filter: &RowFilter,
    ) -> Result<Option<Row>, StoreError> {
        ctx.check()?;
        debug!("Reading row '{}'", key);

        let rows = self.rows.read().await;
        Ok(rows
            .get(key)
            .and_then(|cells| Self::to_row(key, cells, filter)))
    }

    async fn apply(
        &self,
        ctx: &CallContext,
        key: &str,
        mutation: &Mutation,
    ) -> Result<(), StoreError> {
        ctx.check()?;
        if key.is_empty() {
            return Err(StoreError::InvalidMutation("empty row key".to_string()));
        }
        if mutation.is_empty() {
            return Err(StoreError::InvalidMutation(format!(
                "no operations for row '{}'",
                key
            )));
        }

        let mut rows = self.rows.write().await;
        let mut cells = rows.remove(key).unwrap_or_default();
        for op in mutation.ops() {
            match op {
                MutationOp::DeleteRow => cells.clear(),
                MutationOp::DeleteCell { family, column } => {
                    cells.remove(&(family.clone(), column.clone()));
                }
                MutationOp::SetCell {
                    family,
                    column,
                    value,
                } => {
                    cells.insert((family.clone(), column.clone()), value.clone());
                }
            }
        }
        if !cells.is_empty() {
            rows.insert(key.to_string(), cells);
        }

        debug!("Applied {} operation(s) to row '{}'", mutation.ops().len(), key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const DP: &str = "DeviceProperties";

    async fn seeded() -> MemoryRowStore {
        let store = MemoryRowStore::new();
        let ctx = CallContext::background();
        for (key, did) in [
            ("aid-1#qid-1#did-1", "did-1"),
            ("aid-10#qid-10#did-10", "did-10"),
            ("aid-2#qid-2#did-2", "did-2"),
        ] {
            store
                .apply(&ctx, key, &Mutation::new().set(DP, "DeviceId", did))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_prefix_scan_is_ordered_and_limited() {
        let store = seeded().await;
        let ctx = CallContext::background();

        let rows = store
            .read_rows_by_prefix(&ctx, "aid-1", &RowFilter::all(), 10)
            .await
            .unwrap();
        let keys: Vec<&str> = rows.iter().map(Row::key).collect();
        assert_eq!(keys, vec!["aid-1#qid-1#did-1", "aid-10#qid-10#did-10"]);

        let first = store
            .read_rows_by_prefix(&ctx, "aid-1", &RowFilter::all(), 1)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].key(), "aid-1#qid-1#did-1");

        let all = store
            .read_rows_by_prefix(&ctx, "", &RowFilter::all(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_filter_skips_rows_without_matching_cells() {
        let store = seeded().await;
        let ctx = CallContext::background();
        store
            .apply(
                &ctx,
                "aid-10#qid-10#did-10",
                &Mutation::new().set(DP, "ApplianceKey", "k"),
            )
            .await
            .unwrap();

        let filter = RowFilter::cell(DP, "ApplianceKey");
        let row = store.read_by_prefix(&ctx, "aid-1", &filter).await.unwrap();

        assert_eq!(row.unwrap().key(), "aid-10#qid-10#did-10");
    }

    #[tokio::test]
    async fn test_read_field_distinguishes_absent_and_empty() {
        let store = seeded().await;
        let ctx = CallContext::background();
        let key = "aid-2#qid-2#did-2";

        assert_eq!(store.read_field(&ctx, key, DP, "ApplianceKey").await.unwrap(), None);
        assert_eq!(store.read_field(&ctx, "aid-9#q#d", DP, "DeviceId").await.unwrap(), None);

        store
            .apply(&ctx, key, &Mutation::new().set(DP, "ApplianceKey", Vec::<u8>::new()))
            .await
            .unwrap();
        assert_eq!(
            store.read_field(&ctx, key, DP, "ApplianceKey").await.unwrap(),
            Some(Vec::new())
        );
    }

    #[tokio::test]
    async fn test_apply_replaces_and_deletes() {
        let store = seeded().await;
        let ctx = CallContext::background();
        let key = "aid-1#qid-1#did-1";

        store
            .apply(
                &ctx,
                key,
                &Mutation::new().delete_row().set(DP, "ApplianceKey", "appk-test"),
            )
            .await
            .unwrap();
        let row = store.read_row(&ctx, key, &RowFilter::all()).await.unwrap().unwrap();
        assert_eq!(row.cells().len(), 1);
        assert_eq!(row.value(DP, "ApplianceKey"), Some(&b"appk-test"[..]));

        store
            .apply(&ctx, key, &Mutation::new().delete_cell(DP, "ApplianceKey"))
            .await
            .unwrap();
        assert!(store.read_row(&ctx, key, &RowFilter::all()).await.unwrap().is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_mutations_are_rejected() {
        let store = MemoryRowStore::new();
        let ctx = CallContext::background();

        let empty = store.apply(&ctx, "k", &Mutation::new()).await;
        assert!(matches!(empty, Err(StoreError::InvalidMutation(_))));

        let no_key = store.apply(&ctx, "", &Mutation::new().delete_row()).await;
        assert!(matches!(no_key, Err(StoreError::InvalidMutation(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_context_is_refused() {
        let store = seeded().await;
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(20)).await;

        let result = store.read_row(&ctx, "aid-1#qid-1#did-1", &RowFilter::all()).await;
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    }
}
