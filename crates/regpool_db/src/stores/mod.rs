//! Row store implementations
//!
//! `MemoryRowStore` keeps rows in process, `SqlRowStore` keeps them in a
//! cells table behind the sqlx client. `ConfiguredRowStore` picks one of them
//! at runtime from the configuration.

pub mod memory;
pub mod sql;

pub use memory::MemoryRowStore;
pub use sql::SqlRowStore;

use crate::context::CallContext;
use crate::error::StoreError;
use crate::gateway::RowStoreGateway;
use crate::row::{Mutation, Row, RowFilter};

/// A row store chosen by `store.backend`
#[derive(Debug, Clone)]
pub enum ConfiguredRowStore {
    Memory(MemoryRowStore),
    Sql(SqlRowStore),
}

impl ConfiguredRowStore {
    pub fn backend_name(&self) -> &'static str {
        match self {
            ConfiguredRowStore::Memory(_) => "memory",
            ConfiguredRowStore::Sql(_) => "sql",
        }
    }
}

impl RowStoreGateway for ConfiguredRowStore {
    async fn read_rows_by_prefix(
        &self,
        ctx: &CallContext,
        prefix: &str,
        filter: &RowFilter,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        match self {
            ConfiguredRowStore::Memory(store) => {
                store.read_rows_by_prefix(ctx, prefix, filter, limit).await
            }
            ConfiguredRowStore::Sql(store) => {
                store.read_rows_by_prefix(ctx, prefix, filter, limit).await
            }
        }
    }

    async fn read_row(
        &self,
        ctx: &CallContext,
        key: &str,
        filter: &RowFilter,
    ) -> Result<Option<Row>, StoreError> {
        match self {
            ConfiguredRowStore::Memory(store) => store.read_row(ctx, key, filter).await,
            ConfiguredRowStore::Sql(store) => store.read_row(ctx, key, filter).await,
        }
    }

    async fn apply(
        &self,
        ctx: &CallContext,
        key: &str,
        mutation: &Mutation,
    ) -> Result<(), StoreError> {
        match self {
            ConfiguredRowStore::Memory(store) => store.apply(ctx, key, mutation).await,
            ConfiguredRowStore::Sql(store) => store.apply(ctx, key, mutation).await,
        }
    }
}
