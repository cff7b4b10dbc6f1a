//! SQL implementation of the row store gateway
//!
//! Every cell is one record of a cells table keyed by
//! `(row_key, family, qualifier)`. Prefix scans order by `row_key`, which
//! gives the same byte-wise key order as a wide-column store.
//!
//! The table layout, the untyped optional binds and the upsert are SQLite
//! dialect.

use crate::client::DbClient;
use crate::context::CallContext;
use crate::error::StoreError;
use crate::gateway::RowStoreGateway;
use crate::row::{Cell, Mutation, MutationOp, Row, RowFilter};
use sqlx::any::AnyRow;
use sqlx::Row as _;
use tracing::{debug, error, info};

/// SQL implementation of the row store gateway
#[derive(Debug, Clone)]
pub struct SqlRowStore {
    /// The database client
    db_client: DbClient,
    /// Name of the cells table
    table: String,
}

impl SqlRowStore {
    /// Create a store over `table`
    ///
    /// # Errors
    ///
    /// `ConfigError` if the table name is not a plain SQL identifier
    /// (ASCII letters, digits and `_`, not starting with a digit).
    pub fn new(db_client: DbClient, table: impl Into<String>) -> Result<Self, StoreError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(StoreError::ConfigError(format!(
                "invalid table name '{}'",
                table
            )));
        }
        Ok(Self { db_client, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the cells table if it doesn't exist
    ///
    /// This only prepares the adapter's own storage; it does not provision
    /// families, which are implicit in the cells.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        debug!("Initializing cells table '{}'", self.table);

        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                row_key TEXT NOT NULL,
                family TEXT NOT NULL,
                qualifier TEXT NOT NULL,
                value BLOB NOT NULL,
                PRIMARY KEY (row_key, family, qualifier)
            )
        "#,
            self.table
        );

        self.db_client.execute(&query).await?;

        info!("Cells table '{}' initialized successfully", self.table);
        Ok(())
    }

    /// Groups cells ordered by row key into rows.
    fn collect_rows(records: Vec<AnyRow>) -> Result<Vec<Row>, StoreError> {
        let mut rows: Vec<Row> = Vec::new();
        let mut current: Option<(String, Vec<Cell>)> = None;

        for record in records {
            let key: String = record.try_get("row_key")?;
            let cell = Self::decode_cell(&record)?;
            match current.as_mut() {
                Some((current_key, cells)) if *current_key == key => cells.push(cell),
                _ => {
                    if let Some((done_key, cells)) = current.take() {
                        rows.push(Row::new(done_key, cells));
                    }
                    current = Some((key, vec![cell]));
                }
            }
        }
        if let Some((key, cells)) = current {
            rows.push(Row::new(key, cells));
        }
        Ok(rows)
    }

    fn decode_cell(record: &AnyRow) -> Result<Cell, StoreError> {
        Ok(Cell {
            family: record.try_get("family")?,
            column: record.try_get("qualifier")?,
            value: record.try_get("value")?,
        })
    }
}

impl RowStoreGateway for SqlRowStore {
    async fn read_rows_by_prefix(
        &self,
        ctx: &CallContext,
        prefix: &str,
        filter: &RowFilter,
        limit: usize,
    ) -> Result<Vec<Row>, StoreError> {
        ctx.check()?;
        debug!("Scanning rows with prefix '{}' (limit {})", prefix, limit);

        // The row limit is applied to distinct keys that still have matching cells.
        let query = format!(
            r#"
            SELECT row_key, family, qualifier, value
            FROM {t}
            WHERE row_key IN (
                SELECT DISTINCT row_key
                FROM {t}
                WHERE substr(row_key, 1, length($1)) = $2
                  AND ($3 IS NULL OR family = $3)
                  AND ($4 IS NULL OR qualifier = $4)
                ORDER BY row_key
                LIMIT $5
            )
              AND ($6 IS NULL OR family = $6)
              AND ($7 IS NULL OR qualifier = $7)
            ORDER BY row_key, family, qualifier
        "#,
            t = self.table
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let records = ctx
            .run(async {
                sqlx::query(&query)
                    .bind(prefix)
                    .bind(prefix)
                    .bind(filter.family_name())
                    .bind(filter.column_name())
                    .bind(limit)
                    .bind(filter.family_name())
                    .bind(filter.column_name())
                    .fetch_all(self.db_client.pool())
                    .await
                    .map_err(|e| {
                        error!("Failed to scan rows with prefix '{}': {}", prefix, e);
                        StoreError::QueryError(e.to_string())
                    })
            })
            .await?;

        Self::collect_rows(records)
    }

    async fn read_row(
        &self,
        ctx: &CallContext,
        key: &str,
        filter: &RowFilter,
    ) -> Result<Option<Row>, StoreError> {
        ctx.check()?;
        debug!("Reading row '{}'", key);

        let query = format!(
            r#"
            SELECT row_key, family, qualifier, value
            FROM {}
            WHERE row_key = $1
              AND ($2 IS NULL OR family = $2)
              AND ($3 IS NULL OR qualifier = $3)
            ORDER BY family, qualifier
        "#,
            self.table
        );

        let records = ctx
            .run(async {
                sqlx::query(&query)
                    .bind(key)
                    .bind(filter.family_name())
                    .bind(filter.column_name())
                    .fetch_all(self.db_client.pool())
                    .await
                    .map_err(|e| {
                        error!("Failed to read row '{}': {}", key, e);
                        StoreError::QueryError(e.to_string())
                    })
            })
            .await?;

        Ok(Self::collect_rows(records)?.into_iter().next())
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
        debug!("Applying {} operation(s) to row '{}'", mutation.ops().len(), key);

        let delete_row = format!("DELETE FROM {} WHERE row_key = $1", self.table);
        let delete_cell = format!(
            "DELETE FROM {} WHERE row_key = $1 AND family = $2 AND qualifier = $3",
            self.table
        );
        let upsert = format!(
            r#"
            INSERT INTO {} (row_key, family, qualifier, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (row_key, family, qualifier) DO UPDATE SET value = excluded.value
        "#,
            self.table
        );

        ctx.run(async {
            let mut tx = self.db_client.begin().await?;
            for op in mutation.ops() {
                let result = match op {
                    MutationOp::DeleteRow => {
                        sqlx::query(&delete_row).bind(key).execute(&mut *tx).await
                    }
                    MutationOp::DeleteCell { family, column } => {
                        sqlx::query(&delete_cell)
                            .bind(key)
                            .bind(family.as_str())
                            .bind(column.as_str())
                            .execute(&mut *tx)
                            .await
                    }
                    MutationOp::SetCell {
                        family,
                        column,
                        value,
                    } => {
                        sqlx::query(&upsert)
                            .bind(key)
                            .bind(family.as_str())
                            .bind(column.as_str())
                            .bind(value.clone())
                            .execute(&mut *tx)
                            .await
                    }
                };
                result.map_err(|e| {
                    error!("Failed to apply mutation to row '{}': {}", key, e);
                    StoreError::QueryError(e.to_string())
                })?;
            }
            tx.commit()
                .await
                .map_err(|e| StoreError::TransactionError(e.to_string()))
        })
        .await?;

        debug!("Mutation applied to row '{}'", key);
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
