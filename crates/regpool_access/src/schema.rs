//! Column families and columns of the device registration table.

use crate::key::{compose_key, RowKey};
use crate::error::RegistryError;
use serde::{Deserialize, Serialize};

pub const FIREBASE_PROPERTIES: &str = "FirebaseProperties";
pub const DEVICE_PROPERTIES: &str = "DeviceProperties";
pub const REGISTRATION_PROPERTIES: &str = "RegistrationProperties";

/// Every column family of the table, in provisioning order.
pub const COLUMN_FAMILIES: [&str; 3] = [
    FIREBASE_PROPERTIES,
    DEVICE_PROPERTIES,
    REGISTRATION_PROPERTIES,
];

// FirebaseProperties
pub const COLUMN_FCM_TOKEN: &str = "FcmToken";

// DeviceProperties
pub const COLUMN_DEVICE_ID: &str = "DeviceId";
pub const COLUMN_ADOPTION_ID: &str = "AdoptionId";
pub const COLUMN_APPLIANCE_KEY: &str = "ApplianceKey";
pub const COLUMN_AUTH_TOKENS: &str = "AuthTokens";
pub const COLUMN_MAIN_KEY: &str = "MainKey";
pub const COLUMN_TRUSTED: &str = "Trusted";
pub const COLUMN_CREATED_DATE: &str = "CreatedDate";

// RegistrationProperties
pub const COLUMN_CHALLENGE: &str = "Challenge";
pub const COLUMN_REGISTERED: &str = "Registered";

/// Identity tuple of a provisioned device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub aid: String,
    pub qid: String,
    pub did: String,
    pub fcm: String,
}

impl DeviceEntry {
    pub fn new(
        aid: impl Into<String>,
        qid: impl Into<String>,
        did: impl Into<String>,
        fcm: impl Into<String>,
    ) -> Self {
        Self {
            aid: aid.into(),
            qid: qid.into(),
            did: did.into(),
            fcm: fcm.into(),
        }
    }

    /// Key of the pairing row, `AID#QID#DID`.
    pub fn key(&self) -> String {
        compose_key(&self.aid, &self.qid, &self.did)
    }

    /// Key of the device's main row, `QID#DID`.
    pub fn main_key(&self) -> String {
        format!("{}#{}", self.qid, self.did)
    }

    /// The pairing key as a validated `RowKey`.
    pub fn row_key(&self) -> Result<RowKey, RegistryError> {
        RowKey::new(&self.aid, &self.qid, &self.did)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_entry_keys() {
        let entry = DeviceEntry::new("aid-1", "qid-1", "did-1", "fcm-1");
        assert_eq!(entry.key(), "aid-1#qid-1#did-1");
        assert_eq!(entry.main_key(), "qid-1#did-1");
        assert_eq!(entry.row_key().unwrap().pairing(), entry.main_key());
    }

    #[test]
    fn test_device_entry_with_empty_segment_has_no_row_key() {
        let entry = DeviceEntry::new("aid-1", "", "did-1", "fcm-1");
        assert!(matches!(entry.row_key(), Err(RegistryError::BadKey { .. })));
    }

    #[test]
    fn test_column_families_are_distinct() {
        assert_eq!(COLUMN_FAMILIES.len(), 3);
        assert!(COLUMN_FAMILIES.contains(&DEVICE_PROPERTIES));
        assert!(!COLUMN_FAMILIES[1..].contains(&COLUMN_FAMILIES[0]));
        assert_ne!(COLUMN_FAMILIES[1], COLUMN_FAMILIES[2]);
    }
}
