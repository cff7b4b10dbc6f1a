//! Database client for the SQL-backed row store
//!
//! This module provides a client over an SQLx `Any` pool. Only SQLite URLs
//! are accepted: the cells table DDL and queries are written for SQLite.

use crate::error::StoreError;
use regpool_config::{AppConfig, DatabaseConfig};
use sqlx::pool::PoolOptions;
use sqlx::{Pool, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database transaction
pub type DbTransaction<'a> = Transaction<'a, sqlx::Any>;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;

/// Database client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct DbClient {
    /// The database connection pool
    pool: Pool<sqlx::Any>,
}

impl DbClient {
    /// Create a new database client from the application configuration
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    ///
    /// * The database configuration is missing
    /// * The database URL is missing
    /// * The database connection fails
    pub async fn new(config: &Arc<AppConfig>) -> Result<Self, StoreError> {
        let db_config = config.database.as_ref().ok_or_else(|| {
            StoreError::ConfigError("Database configuration is missing".to_string())
        })?;

        Self::from_config(db_config).await
    }

    /// Create a new database client from a database configuration
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    ///
    /// * The database URL is missing
    /// * The database connection fails
    pub async fn from_config(db_config: &DatabaseConfig) -> Result<Self, StoreError> {
        if db_config.url.is_empty() {
            return Err(StoreError::ConfigError("Database URL is empty".to_string()));
        }

        let pool = Self::create_pool(
            &db_config.url,
            db_config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            Duration::from_secs(
                db_config
                    .acquire_timeout_secs
                    .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            ),
        )
        .await?;

        Ok(Self { pool })
    }

    /// Create a new database client from a database URL with default pool settings
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    ///
    /// * The database URL is invalid or not an SQLite URL
    /// * The database connection fails
    pub async fn from_url(db_url: &str) -> Result<Self, StoreError> {
        if db_url.is_empty() {
            return Err(StoreError::UrlError("Database URL is empty".to_string()));
        }

        let pool = Self::create_pool(
            db_url,
            DEFAULT_MAX_CONNECTIONS,
            Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        )
        .await?;

        Ok(Self { pool })
    }

    /// Create a connection pool
    ///
    /// SQLite in-memory databases live only as long as their connection, so
    /// for those the pool is pinned to a single connection that is never reaped.
    async fn create_pool(
        db_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Pool<sqlx::Any>, StoreError> {
        if !db_url.starts_with("sqlite:") {
            let scheme = db_url.split(':').next().unwrap_or_default();
            error!("Unsupported database scheme '{}'", scheme);
            return Err(StoreError::UrlError(format!(
                "unsupported database scheme '{}', expected 'sqlite:'",
                scheme
            )));
        }

        debug!("Creating database pool with URL: {}", db_url);

        sqlx::any::install_default_drivers();

        let in_memory = db_url.starts_with("sqlite:") && db_url.contains(":memory:");

        let pool_options = if in_memory {
            PoolOptions::<sqlx::Any>::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(Option::<Duration>::None)
                .max_lifetime(Option::<Duration>::None)
        } else {
            PoolOptions::<sqlx::Any>::new()
                .max_connections(max_connections.max(1))
                .idle_timeout(Duration::from_secs(600))
        }
        .acquire_timeout(acquire_timeout);

        if db_url.starts_with("sqlite:") && !in_memory {
            Self::ensure_sqlite_file(db_url)?;
        }

        let pool = pool_options
            .connect_with(sqlx::any::AnyConnectOptions::from_str(db_url)?)
            .await
            .map_err(|e| {
                error!("Failed to create database pool: {}", e);
                StoreError::PoolError(e.to_string())
            })?;

        info!("Database pool created successfully");
        Ok(pool)
    }

    /// Creates the SQLite database file and its directory if they don't exist yet.
    fn ensure_sqlite_file(db_url: &str) -> Result<(), StoreError> {
        // Handle both "sqlite:example.db" and "sqlite://example.db" formats
        let db_path = db_url
            .strip_prefix("sqlite://")
            .or_else(|| db_url.strip_prefix("sqlite:"))
            .unwrap_or(db_url);
        // Drop connection parameters such as ?mode=rwc
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        if db_path.is_empty() {
            return Ok(());
        }

        let path = std::path::Path::new(db_path);
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                debug!("Creating directory for SQLite database: {:?}", dir);
                std::fs::create_dir_all(dir).map_err(|e| {
                    error!("Failed to create directory for SQLite database: {}", e);
                    StoreError::PoolError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        if !path.exists() {
            debug!("Creating empty SQLite database file: {}", db_path);
            std::fs::File::create(path).map_err(|e| {
                error!("Failed to create SQLite database file: {}", e);
                StoreError::PoolError(format!("Failed to create database file: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the database connection pool
    pub fn pool(&self) -> &Pool<sqlx::Any> {
        &self.pool
    }

    /// Begin a transaction
    pub async fn begin(&self) -> Result<DbTransaction<'static>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| StoreError::TransactionError(e.to_string()))
    }

    /// Execute a query that returns no rows
    ///
    /// # Returns
    ///
    /// The number of rows affected
    pub async fn execute(&self, query: &str) -> Result<u64, StoreError> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| StoreError::QueryError(e.to_string()))
    }
}

impl std::fmt::Display for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbClient")
    }
}
