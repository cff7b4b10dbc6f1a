//! Factories for database clients and row stores
//!
//! Callers hand in the application configuration and get back a ready row
//! store; they never need to know which backend was selected.

use crate::client::DbClient;
use crate::error::StoreError;
use crate::stores::{ConfiguredRowStore, MemoryRowStore, SqlRowStore};
use regpool_config::{AppConfig, DatabaseConfig, StoreBackend};
use std::sync::Arc;
use tracing::{debug, info};

/// Factory for creating database clients
#[derive(Debug, Clone)]
pub struct DbClientFactory;

impl DbClientFactory {
    /// Create a new database client factory
    pub fn new() -> Self {
        Self
    }

    /// Create a new database client from an application configuration
    ///
    /// # Errors
    ///
    /// This method will return an error if:
    ///
    /// * The database configuration is missing
    /// * The database URL is missing
    /// * The database connection fails
    pub async fn from_app_config(&self, config: &Arc<AppConfig>) -> Result<DbClient, StoreError> {
        debug!("Creating database client from application configuration");
        DbClient::new(config).await
    }

    /// Create a new database client from a database configuration
    pub async fn from_db_config(&self, db_config: &DatabaseConfig) -> Result<DbClient, StoreError> {
        debug!("Creating database client from database configuration");
        DbClient::from_config(db_config).await
    }

    /// Create a new database client from a database URL
    pub async fn from_url(&self, db_url: &str) -> Result<DbClient, StoreError> {
        debug!("Creating database client from URL");
        DbClient::from_url(db_url).await
    }
}

impl Default for DbClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for creating the row store named by the configuration
#[derive(Debug, Clone, Default)]
pub struct RowStoreFactory {
    db_factory: DbClientFactory,
}

impl RowStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the row store selected by `store.backend`
    ///
    /// For the SQL backend the cells table is named after `store.table` and
    /// created if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// This method will return an error if:
    ///
    /// * The SQL backend is selected without a `[database]` section
    /// * The table name is not a valid SQL identifier
    /// * The database connection or table creation fails
    pub async fn from_app_config(
        &self,
        config: &Arc<AppConfig>,
    ) -> Result<ConfiguredRowStore, StoreError> {
        match config.store.backend {
            StoreBackend::Memory => {
                info!("Using in-memory row store for table '{}'", config.store.table);
                Ok(ConfiguredRowStore::Memory(MemoryRowStore::new()))
            }
            StoreBackend::Sql => {
                let db_client = self.db_factory.from_app_config(config).await?;
                let store = SqlRowStore::new(db_client, config.store.table.clone())?;
                store.init_schema().await?;
                info!("Using SQL row store for table '{}'", store.table());
                Ok(ConfiguredRowStore::Sql(store))
            }
        }
    }
}
