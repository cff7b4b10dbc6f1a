//! Error types for the row store gateway

use thiserror::Error;

/// Errors raised by a row store itself.
///
/// None of these mean "row not found": absence is reported through `Option`
/// by every gateway read, so callers can always tell a missing pairing apart
/// from a store that could not answer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Error from SQLx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Error with the store configuration
    #[error("Store configuration error: {0}")]
    ConfigError(String),

    /// Error with database URL parsing
    #[error("Database URL error: {0}")]
    UrlError(String),

    /// Error with database pool creation
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// Error with a store query
    #[error("Store query error: {0}")]
    QueryError(String),

    /// Error with database transaction
    #[error("Database transaction error: {0}")]
    TransactionError(String),

    /// The caller's deadline passed before the store answered
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The store refused or could not serve the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A write that the store cannot apply (empty mutation, empty row key, ...)
    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),
}

impl StoreError {
    /// Whether the failure is tied to the caller's deadline rather than the store.
    pub fn is_deadline(&self) -> bool {
        matches!(self, StoreError::DeadlineExceeded)
    }
}
