//! Registration state of an AID.

use crate::error::RegistryError;
use std::fmt;

/// Outcome of classifying an AID, readable as a
/// `(paired_unregistered, key, error)` triple.
///
/// * `(false, "", Some(err))` when the AID could not be resolved
/// * `(true, key, None)` when the pairing row has no AppK
/// * `(false, key, Some(UnexpectedAppK))` when it already has one
/// * `(false, key, Some(Store))` when the AppK read failed
///
/// `paired_unregistered` holds exactly when there is no error.
#[derive(Debug)]
pub struct Classification {
    key: String,
    error: Option<RegistryError>,
}

impl Classification {
    pub(crate) fn unresolved(error: RegistryError) -> Self {
        Self {
            key: String::new(),
            error: Some(error),
        }
    }

    pub(crate) fn eligible(key: String) -> Self {
        Self { key, error: None }
    }

    pub(crate) fn refused(key: String, error: RegistryError) -> Self {
        Self {
            key,
            error: Some(error),
        }
    }

    pub fn paired_unregistered(&self) -> bool {
        self.error.is_none()
    }

    /// The resolved row key, empty when the AID was not resolved.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn error(&self) -> Option<&RegistryError> {
        self.error.as_ref()
    }

    pub fn into_parts(self) -> (bool, String, Option<RegistryError>) {
        (self.error.is_none(), self.key, self.error)
    }
}

/// Terminal states of a registration lookup.
#[derive(Debug)]
pub enum RegistrationState {
    /// No pairing row exists for the AID
    NotPaired { aid: String },
    /// Paired, and no AppK has been stored yet: eligible for registration
    PairedUnregistered { key: String },
    /// Paired, and an AppK is stored: registration is in flight or done
    PairedWithKey { key: String },
    /// The AID or the stored key is malformed; asking again gives the same answer
    Rejected { error: RegistryError },
    /// The state could not be decided; the caller may ask again
    Indeterminate {
        key: Option<String>,
        error: RegistryError,
    },
}

impl RegistrationState {
    /// The pairing key, when one was resolved.
    pub fn key(&self) -> Option<&str> {
        match self {
            RegistrationState::NotPaired { .. } | RegistrationState::Rejected { .. } => None,
            RegistrationState::PairedUnregistered { key }
            | RegistrationState::PairedWithKey { key } => Some(key),
            RegistrationState::Indeterminate { key, .. } => key.as_deref(),
        }
    }

    /// Only a paired row without AppK may be registered.
    pub fn is_eligible(&self) -> bool {
        matches!(self, RegistrationState::PairedUnregistered { .. })
    }

    /// Whether a later lookup may reach a different answer without any write.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistrationState::Indeterminate { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationState::NotPaired { .. } => "not_paired",
            RegistrationState::PairedUnregistered { .. } => "paired_unregistered",
            RegistrationState::PairedWithKey { .. } => "paired_with_key",
            RegistrationState::Rejected { .. } => "rejected",
            RegistrationState::Indeterminate { .. } => "indeterminate",
        }
    }
}

impl From<Classification> for RegistrationState {
    fn from(classification: Classification) -> Self {
        let Classification { key, error } = classification;

        match error {
            None => RegistrationState::PairedUnregistered { key },
            Some(RegistryError::NotPaired { aid }) => RegistrationState::NotPaired { aid },
            Some(RegistryError::UnexpectedAppK { key }) => RegistrationState::PairedWithKey { key },
            Some(error @ RegistryError::BadKey { .. }) => RegistrationState::Rejected { error },
            Some(error) => RegistrationState::Indeterminate {
                key: Some(key).filter(|key| !key.is_empty()),
                error,
            },
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationState::NotPaired { aid } => write!(f, "not paired ({})", aid),
            RegistrationState::PairedUnregistered { key } => {
                write!(f, "paired, unregistered ({})", key)
            }
            RegistrationState::PairedWithKey { key } => write!(f, "paired with AppK ({})", key),
            RegistrationState::Rejected { error } => write!(f, "rejected: {}", error),
            RegistrationState::Indeterminate { error, .. } => write!(f, "indeterminate: {}", error),
        }
    }
}
