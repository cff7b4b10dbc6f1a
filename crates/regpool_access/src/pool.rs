//! Registration pool access
//!
//! `RegistrationPool` answers one question for the registration endpoint: may
//! this AID register now? It resolves the AID to its pairing row, reads the
//! row's AppK and folds the two answers into a classification.
//!
//! Every call goes through the row store gateway with the caller's
//! `CallContext`. Nothing is cached and nothing is retried, so two calls
//! without a write in between always return the same answer.

use crate::error::RegistryError;
use crate::key::{RowKey, KEY_DELIMITER};
use crate::record::{appk_fingerprint, DeviceRecord};
use crate::schema::{COLUMN_APPLIANCE_KEY, DEVICE_PROPERTIES};
use crate::state::{Classification, RegistrationState};
use regpool_config::AppConfig;
use regpool_db::{
    CallContext, ConfiguredRowStore, Row, RowFilter, RowStoreFactory, RowStoreGateway, StoreError,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Read access to the registration pool over a row store gateway.
#[derive(Debug, Clone)]
pub struct RegistrationPool<G> {
    gateway: G,
}

impl RegistrationPool<ConfiguredRowStore> {
    /// Creates a pool over the row store selected by the configuration
    ///
    /// # Errors
    ///
    /// Fails if the configured store cannot be created.
    pub async fn from_app_config(config: &Arc<AppConfig>) -> Result<Self, StoreError> {
        let store = RowStoreFactory::new().from_app_config(config).await?;
        info!(
            "Registration pool ready on {} store (project '{}', instance '{}', table '{}')",
            store.backend_name(),
            config.store.project,
            config.store.instance,
            config.store.table
        );
        Ok(Self::new(store))
    }
}

impl<G: RowStoreGateway> RegistrationPool<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Resolves an AID to the full key of its pairing row
    ///
    /// # Errors
    ///
    /// * `BadKey` if the AID is empty or contains `#`
    /// * `NotPaired` if no pairing row exists
    /// * `DuplicatePairing` if more than one row is paired with the AID
    /// * `Store` if the scan failed
    pub async fn resolve_aid(&self, ctx: &CallContext, aid: &str) -> Result<String, RegistryError> {
        let row = self.get_aid_row(ctx, aid).await?;
        let (key, _) = row.into_parts();
        debug!("Resolved aid '{}' to '{}'", aid, key);
        Ok(key)
    }

    /// Resolves an AID to its whole pairing row
    ///
    /// Same rules as `resolve_aid`.
    pub async fn get_aid_row(&self, ctx: &CallContext, aid: &str) -> Result<Row, RegistryError> {
        if aid.is_empty() || aid.contains(KEY_DELIMITER) {
            return Err(RegistryError::BadKey {
                key: aid.to_string(),
            });
        }

        let prefix = RowKey::aid_prefix(aid);
        // Two rows are enough to tell a unique pairing from a duplicate one.
        let rows = self
            .gateway
            .read_rows_by_prefix(ctx, &prefix, &RowFilter::all(), 2)
            .await
            .map_err(|e| {
                error!("Failed to scan pairing rows for aid '{}': {}", aid, e);
                RegistryError::store(aid, e)
            })?;

        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (None, _) => {
                debug!("No pairing for aid '{}'", aid);
                Err(RegistryError::NotPaired {
                    aid: aid.to_string(),
                })
            }
            (Some(row), None) => Ok(row),
            (Some(first), Some(second)) => {
                let keys = vec![first.key().to_string(), second.key().to_string()];
                warn!("Aid '{}' is paired more than once: {:?}", aid, keys);
                Err(RegistryError::DuplicatePairing {
                    aid: aid.to_string(),
                    keys,
                })
            }
        }
    }

    /// Reads the AppK stored in the pairing row `key`
    ///
    /// # Errors
    ///
    /// * `NoAppK` if the row, or its AppK, is missing or empty
    /// * `Store` if the read failed
    pub async fn get_appk(&self, ctx: &CallContext, key: &str) -> Result<Vec<u8>, RegistryError> {
        let appk = self
            .gateway
            .read_field(ctx, key, DEVICE_PROPERTIES, COLUMN_APPLIANCE_KEY)
            .await
            .map_err(|e| {
                error!("Failed to read AppK of '{}': {}", key, e);
                RegistryError::store(key, e)
            })?;

        match appk {
            Some(appk) if !appk.is_empty() => Ok(appk),
            _ => Err(RegistryError::NoAppK {
                key: key.to_string(),
            }),
        }
    }

    /// Classifies an AID
    ///
    /// `paired_unregistered` is true only when the AID has a pairing row
    /// without AppK. See `Classification` for the possible triples.
    pub async fn classify_aid(&self, ctx: &CallContext, aid: &str) -> Classification {
        let key = match self.resolve_aid(ctx, aid).await {
            Ok(key) => key,
            Err(e) => return Classification::unresolved(e),
        };

        match self.get_appk(ctx, &key).await {
            Err(RegistryError::NoAppK { .. }) => {
                debug!("'{}' is paired and unregistered", key);
                Classification::eligible(key)
            }
            Ok(appk) => {
                debug!(
                    "'{}' already holds AppK sha256:{}",
                    key,
                    appk_fingerprint(&appk)
                );
                let error = RegistryError::UnexpectedAppK { key: key.clone() };
                Classification::refused(key, error)
            }
            Err(e) => Classification::refused(key, e),
        }
    }

    /// Classifies an AID into one of the terminal states.
    pub async fn registration_state(&self, ctx: &CallContext, aid: &str) -> RegistrationState {
        let state = RegistrationState::from(self.classify_aid(ctx, aid).await);
        debug!("Registration state of aid '{}': {}", aid, state.as_str());
        state
    }

    /// Lists every value of `family:column` across the table, logging each one
    ///
    /// Rows without that cell are skipped.
    pub async fn read_all_values(
        &self,
        ctx: &CallContext,
        family: &str,
        column: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, RegistryError> {
        info!("Reading all {} in {} rows", column, family);

        let rows = self
            .gateway
            .read_rows_by_prefix(ctx, "", &RowFilter::cell(family, column), usize::MAX)
            .await
            .map_err(|e| {
                error!("Failed to read {}:{} values: {}", family, column, e);
                RegistryError::store(&format!("{}:{}", family, column), e)
            })?;

        let values: Vec<(String, Vec<u8>)> = rows
            .into_iter()
            .filter_map(|row| {
                let value = row.value(family, column)?.to_vec();
                let (key, _) = row.into_parts();
                Some((key, value))
            })
            .collect();

        for (key, value) in &values {
            if column == COLUMN_APPLIANCE_KEY {
                info!("\t{} = sha256:{}", key, appk_fingerprint(value));
            } else {
                info!("\t{} = {}", key, String::from_utf8_lossy(value));
            }
        }
        Ok(values)
    }

    /// Reads the pairing row `key` as a `DeviceRecord`
    ///
    /// # Errors
    ///
    /// * `BadKey` if `key` is not `AID#QID#DID`
    /// * `NotFound` if the row doesn't exist
    /// * `MalformedField` if a column cannot be decoded
    /// * `Store` if the read failed
    pub async fn device_record(
        &self,
        ctx: &CallContext,
        key: &str,
    ) -> Result<DeviceRecord, RegistryError> {
        let _: RowKey = key.parse()?;

        let row = self
            .gateway
            .read_row(ctx, key, &RowFilter::all())
            .await
            .map_err(|e| {
                error!("Failed to read row '{}': {}", key, e);
                RegistryError::store(key, e)
            })?
            .ok_or_else(|| RegistryError::NotFound {
                key: key.to_string(),
            })?;

        DeviceRecord::from_row(&row)
    }
}
