//! Composite row keys
//!
//! A pairing row is stored under `AID#QID#DID`. The `QID#DID` part alone is
//! the key of the device's main row, which is what `parse_rp_key` extracts.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the segments of a composite key.
pub const KEY_DELIMITER: char = '#';

/// Extracts `QID#DID` from a well-formed `AID#QID#DID` key.
///
/// # Errors
///
/// `BadKey` unless the key splits into exactly three non-empty segments.
///
/// ```
/// use regpool_access::key::parse_rp_key;
///
/// assert_eq!(parse_rp_key("aid123#qid123#did123").unwrap(), "qid123#did123");
/// assert!(parse_rp_key("aid123##").is_err());
/// ```
pub fn parse_rp_key(key: &str) -> Result<String, RegistryError> {
    key.parse::<RowKey>().map(|key| key.pairing())
}

/// Builds `AID#QID#DID`. No validation is done here; see `RowKey::new`.
pub fn compose_key(aid: &str, qid: &str, did: &str) -> String {
    format!("{aid}{KEY_DELIMITER}{qid}{KEY_DELIMITER}{did}")
}

/// A parsed `AID#QID#DID` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    aid: String,
    qid: String,
    did: String,
}

impl RowKey {
    /// Creates a key from its segments
    ///
    /// # Errors
    ///
    /// `BadKey` if a segment is empty or contains the delimiter.
    pub fn new(
        aid: impl Into<String>,
        qid: impl Into<String>,
        did: impl Into<String>,
    ) -> Result<Self, RegistryError> {
        let (aid, qid, did) = (aid.into(), qid.into(), did.into());
        let valid = [&aid, &qid, &did]
            .iter()
            .all(|segment| !segment.is_empty() && !segment.contains(KEY_DELIMITER));
        if !valid {
            return Err(RegistryError::BadKey {
                key: compose_key(&aid, &qid, &did),
            });
        }
        Ok(Self { aid, qid, did })
    }

    pub fn aid(&self) -> &str {
        &self.aid
    }

    pub fn qid(&self) -> &str {
        &self.qid
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    /// `QID#DID`, the key of the device's main row.
    pub fn pairing(&self) -> String {
        format!("{}{KEY_DELIMITER}{}", self.qid, self.did)
    }

    /// Prefix that matches the pairing rows of `aid` and nothing else.
    ///
    /// `aid-1#` does not match `aid-10#...`, a bare `aid-1` would.
    pub fn aid_prefix(aid: &str) -> String {
        format!("{aid}{KEY_DELIMITER}")
    }
}

impl FromStr for RowKey {
    type Err = RegistryError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let bad_key = || RegistryError::BadKey {
            key: key.to_string(),
        };
        let segments: Vec<&str> = key.split(KEY_DELIMITER).collect();
        match segments.as_slice() {
            [aid, qid, did] if !aid.is_empty() && !qid.is_empty() && !did.is_empty() => Ok(Self {
                aid: aid.to_string(),
                qid: qid.to_string(),
                did: did.to_string(),
            }),
            _ => Err(bad_key()),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&compose_key(&self.aid, &self.qid, &self.did))
    }
}
