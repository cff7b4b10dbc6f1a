//! Logging utilities for the registration pool.
//!
//! Every crate logs through `tracing`; binaries and test harnesses call one of
//! the `init` functions here once to install the subscriber.

use regpool_config::LoggingConfig;
use std::str::FromStr;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crate-name prefix the level directive is applied to.
const TARGET_PREFIX: &str = "regpool";

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use regpool_common::logging;
///
/// logging::init();
/// logging::init_with_level(tracing::Level::DEBUG);
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` directives are honoured in addition to the level, which is
/// applied to every `regpool*` target. Calling this more than once is
/// harmless: the first subscriber wins.
pub fn init_with_level(level: Level) {
    // Target directives match by prefix, so this covers regpool_db, regpool_access, ...
    let mut filter = EnvFilter::from_default_env();
    match format!("{}={}", TARGET_PREFIX, level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Warning: invalid log directive: {}", e),
    }

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize the subscriber from the `[logging]` section of the configuration.
///
/// An unknown level name falls back to INFO with a warning.
pub fn init_from_config(config: &LoggingConfig) {
    match Level::from_str(&config.level) {
        Ok(level) => init_with_level(level),
        Err(_) => {
            init_with_level(Level::INFO);
            warn!("Unknown log level '{}', using INFO", config.level);
        }
    }
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    error!("{}: {}", context, error);
}

/// Log a result, INFO on success and ERROR on failure, and hand it back.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => info!("{}", success_message),
        Err(e) => error!("{}: {}", error_context, e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_with_level(Level::DEBUG);
        init();
        init_from_config(&LoggingConfig {
            level: "not-a-level".to_string(),
        });
    }

    #[test]
    fn test_log_result_passes_value_through() {
        let ok: Result<u8, String> = log_result(Ok(7), "done", "failed");
        assert_eq!(ok, Ok(7));

        let err: Result<u8, String> = log_result(Err("boom".to_string()), "done", "failed");
        assert_eq!(err, Err("boom".to_string()));
    }
}
