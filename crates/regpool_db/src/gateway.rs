//! The row store gateway trait
//!
//! This is the narrow read/write contract the registration pool needs from a
//! wide-column store. Any backend (the in-memory store used by tests, the SQL
//! cells table, a managed wide-column service) plugs in by implementing it.

use crate::context::CallContext;
use crate::error::StoreError;
use crate::row::{Mutation, Row, RowFilter};
use std::future::Future;

/// Capability over a wide-column store.
///
/// Reads report absence through `Option` and reserve `Err` for store failures.
/// Implementations must honour the deadline of the `CallContext` they are given
/// and must be safe to share between tasks.
pub trait RowStoreGateway: Send + Sync {
    /// Read the rows whose key starts with `prefix`
    ///
    /// # Arguments
    ///
    /// * `ctx` - The call context carrying the caller's deadline
    /// * `prefix` - Key prefix; the empty prefix scans the whole keyspace
    /// * `filter` - Family/column projection applied to each row
    /// * `limit` - Maximum number of rows to return
    ///
    /// # Returns
    ///
    /// At most `limit` rows in ascending key order. Rows left without cells by
    /// the filter are skipped and do not count towards the limit. The scan stops
    /// as soon as `limit` rows have been found.
    fn read_rows_by_prefix(
        &self,
        ctx: &CallContext,
        prefix: &str,
        filter: &RowFilter,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;

    /// Read a single row by its full key
    ///
    /// # Returns
    ///
    /// The row if it exists and holds cells matching `filter`, or None
    fn read_row(
        &self,
        ctx: &CallContext,
        key: &str,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Option<Row>, StoreError>> + Send;

    /// Apply a mutation to the row stored under `key`
    ///
    /// The operations are applied in order and atomically. Setting a cell
    /// replaces its previous value; a row left without cells ceases to exist.
    fn apply(
        &self,
        ctx: &CallContext,
        key: &str,
        mutation: &Mutation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// First row whose key starts with `prefix`, or None.
    fn read_by_prefix(
        &self,
        ctx: &CallContext,
        prefix: &str,
        filter: &RowFilter,
    ) -> impl Future<Output = Result<Option<Row>, StoreError>> + Send {
        async move {
            let rows = self.read_rows_by_prefix(ctx, prefix, filter, 1).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Point read of a single field.
    ///
    /// A missing row and a field that was never written both yield `Ok(None)`.
    fn read_field(
        &self,
        ctx: &CallContext,
        key: &str,
        family: &str,
        column: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send {
        async move {
            let filter = RowFilter::cell(family, column);
            let row = self.read_row(ctx, key, &filter).await?;
            Ok(row.and_then(|row| row.value(family, column).map(<[u8]>::to_vec)))
        }
    }
}
