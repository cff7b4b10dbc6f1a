// --- File: crates/regpool_config/src/models.rs ---

use serde::{Deserialize, Serialize};

/// Default GCP project hosting the device table.
pub const DEFAULT_PROJECT: &str = "smoothwall-sandbox";
/// Default wide-column instance.
pub const DEFAULT_INSTANCE: &str = "uapl-dev-devicemgmt";
/// Default device table.
pub const DEFAULT_TABLE: &str = "UaplDevices";

// --- Store Config ---
/// Which row store implementation backs the registration pool.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local ordered map, used for tests and local runs.
    #[default]
    Memory,
    /// Cells table behind the sqlx client (see `DatabaseConfig`).
    Sql,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_instance")]
    pub instance: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub backend: StoreBackend,
    /// Per-call budget handed to every gateway call. `None` means no deadline.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            instance: default_instance(),
            table: default_table(),
            backend: StoreBackend::default(),
            request_timeout_ms: None,
        }
    }
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

fn default_instance() -> String {
    DEFAULT_INSTANCE.to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite://data/regpool.db, loaded via REGPOOL__DATABASE__URL
    #[serde(default)]
    pub max_connections: Option<u32>,
    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>,
}

// --- Logging Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: Option<DatabaseConfig>, // required when store.backend = "sql"
    #[serde(default)]
    pub logging: LoggingConfig,
}
