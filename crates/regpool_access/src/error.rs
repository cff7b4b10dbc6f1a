//! Error types for registration pool access

use regpool_db::StoreError;
use thiserror::Error;

/// Outcome errors of the key codec, the resolver and the AppK reader.
///
/// `NotPaired` and `NoAppK` are business outcomes and are expected in normal
/// operation; `Store` wraps a failure of the underlying row store.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The key is not made of exactly three non-empty `#`-separated segments
    #[error("invalid key format: '{key}'")]
    BadKey { key: String },

    /// No pairing row exists for the AID
    #[error("no aid-did pairing in registration pool for '{aid}'")]
    NotPaired { aid: String },

    /// The pairing row carries no AppK, or an empty one
    #[error("no AppK stored: key {key}")]
    NoAppK { key: String },

    /// The pairing row already carries an AppK
    #[error("found AppK when none should exist: key {key}")]
    UnexpectedAppK { key: String },

    /// More than one pairing row matches the AID
    #[error("aid '{aid}' is paired more than once: {keys:?}")]
    DuplicatePairing { aid: String, keys: Vec<String> },

    /// No row is stored under the key
    #[error("row not found: {key}")]
    NotFound { key: String },

    /// A stored value could not be decoded
    #[error("malformed {column} in row {key}: {reason}")]
    MalformedField {
        key: String,
        column: String,
        reason: String,
    },

    /// The row store failed while reading `target` (an AID or a row key)
    #[error("could not read row with key {target}: {source}")]
    Store {
        target: String,
        #[source]
        source: StoreError,
    },
}

impl RegistryError {
    pub(crate) fn store(target: &str, source: StoreError) -> Self {
        RegistryError::Store {
            target: target.to_string(),
            source,
        }
    }

    /// Whether this is an expected answer rather than a failure.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            RegistryError::NotPaired { .. } | RegistryError::NoAppK { .. }
        )
    }

    pub fn is_store_error(&self) -> bool {
        matches!(self, RegistryError::Store { .. })
    }

    /// The key or AID the error is about.
    pub fn key(&self) -> &str {
        match self {
            RegistryError::BadKey { key }
            | RegistryError::NoAppK { key }
            | RegistryError::UnexpectedAppK { key }
            | RegistryError::NotFound { key }
            | RegistryError::MalformedField { key, .. } => key,
            RegistryError::NotPaired { aid } | RegistryError::DuplicatePairing { aid, .. } => aid,
            RegistryError::Store { target, .. } => target,
        }
    }
}
