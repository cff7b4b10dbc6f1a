//! Configuration for the registration pool.
//!
//! Values are layered the same way for every crate in the workspace:
//!
//! 1. `<config dir>/default.{toml,yaml,json}` (optional)
//! 2. `<config dir>/<RUN_ENV>.{toml,yaml,json}` (optional, `RUN_ENV` defaults to `debug`)
//! 3. environment variables prefixed with `REGPOOL` (or `$PREFIX`), using `__`
//!    as separator, e.g. `REGPOOL__STORE__BACKEND=sql`
//!
//! The config dir defaults to `config` and can be moved with `REGPOOL_CONFIG_DIR`.
//! A `.env` file is loaded once before any lookup.

use config::{Config, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod models;

pub use config::ConfigError;
pub use models::*;

/// Default environment variable prefix.
pub const DEFAULT_PREFIX: &str = "REGPOOL";

/// Separator between nested keys in environment variables.
pub const CONFIG_SEPARATOR: &str = "__";

/// Environment variable naming the config directory.
pub const CONFIG_DIR_VAR: &str = "REGPOOL_CONFIG_DIR";

/// Loads the configuration from the default config directory.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let dir = env::var(CONFIG_DIR_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));
    load_config_from(dir)
}

/// Loads the configuration from `dir`, then applies `RUN_ENV` and environment overrides.
pub fn load_config_from(dir: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let dir = dir.as_ref();
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string());

    let default_path = dir.join("default");
    let env_path = dir.join(&run_env);

    debug!(
        "Loading configuration from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix(&prefix).separator(CONFIG_SEPARATOR));

    builder.build()?.try_deserialize()
}

/// Convert a configuration path to the environment variable that overrides it.
///
/// `store.backend` becomes `REGPOOL__STORE__BACKEND`.
pub fn config_path_to_env_var(path: &str) -> String {
    let prefix = env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string());
    let path = path.replace('.', CONFIG_SEPARATOR);
    format!("{}{}{}", prefix, CONFIG_SEPARATOR, path).to_uppercase()
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Ensures the dotenv file is loaded into the process environment exactly once.
///
/// `DOTENV_OVERRIDE` picks a different file; the default is `.env`. A missing
/// file is not an error. Returns the path that was (or would have been) read.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
