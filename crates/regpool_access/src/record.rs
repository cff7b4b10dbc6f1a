//! Typed view of a device registration row.

use crate::error::RegistryError;
use crate::key::RowKey;
use crate::schema::{
    COLUMN_ADOPTION_ID, COLUMN_APPLIANCE_KEY, COLUMN_AUTH_TOKENS, COLUMN_CHALLENGE,
    COLUMN_CREATED_DATE, COLUMN_DEVICE_ID, COLUMN_FCM_TOKEN, COLUMN_MAIN_KEY, COLUMN_REGISTERED,
    COLUMN_TRUSTED, DEVICE_PROPERTIES, FIREBASE_PROPERTIES, REGISTRATION_PROPERTIES,
};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regpool_db::Row;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;

/// Short, non-reversible identifier of an AppK for log lines.
///
/// The first 8 bytes of its SHA-256 digest, hex encoded.
pub fn appk_fingerprint(appk: &[u8]) -> String {
    let digest = Sha256::digest(appk);
    hex::encode(&digest[..8])
}

/// One registration row with its columns decoded.
///
/// Secrets (`appk`, `auth_tokens`, `main_key`) are never serialized and are
/// redacted by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub key: RowKey,
    pub device_id: Option<String>,
    pub adoption_id: Option<String>,
    #[serde(skip)]
    pub appk: Option<Vec<u8>>,
    #[serde(skip)]
    pub auth_tokens: Option<String>,
    #[serde(skip)]
    pub main_key: Option<String>,
    pub trusted: Option<bool>,
    pub created: Option<DateTime<Utc>>,
    pub challenge: Option<String>,
    pub registered: Option<DateTime<Utc>>,
    pub fcm_token: Option<String>,
}

impl DeviceRecord {
    /// Decodes a row read without filter
    ///
    /// Missing cells become `None`. Empty `Trusted`, `CreatedDate` and
    /// `Registered` cells are treated as missing.
    ///
    /// # Errors
    ///
    /// * `BadKey` if the row key is not `AID#QID#DID`
    /// * `MalformedField` if a cell holds invalid UTF-8, a boolean other than
    ///   `true`/`false`/`1`/`0`, or an unparsable timestamp
    ///
    /// A Unix-date timestamp in an unknown zone abbreviation is logged and
    /// left as `None`.
    pub fn from_row(row: &Row) -> Result<Self, RegistryError> {
        let key: RowKey = row.key().parse()?;
        let decoder = CellDecoder { row };

        Ok(Self {
            device_id: decoder.text(DEVICE_PROPERTIES, COLUMN_DEVICE_ID)?,
            adoption_id: decoder.text(DEVICE_PROPERTIES, COLUMN_ADOPTION_ID)?,
            appk: row
                .value(DEVICE_PROPERTIES, COLUMN_APPLIANCE_KEY)
                .map(<[u8]>::to_vec),
            auth_tokens: decoder.text(DEVICE_PROPERTIES, COLUMN_AUTH_TOKENS)?,
            main_key: decoder.text(DEVICE_PROPERTIES, COLUMN_MAIN_KEY)?,
            trusted: decoder.flag(DEVICE_PROPERTIES, COLUMN_TRUSTED)?,
            created: decoder.timestamp(DEVICE_PROPERTIES, COLUMN_CREATED_DATE)?,
            challenge: decoder.text(REGISTRATION_PROPERTIES, COLUMN_CHALLENGE)?,
            registered: decoder.timestamp(REGISTRATION_PROPERTIES, COLUMN_REGISTERED)?,
            fcm_token: decoder.text(FIREBASE_PROPERTIES, COLUMN_FCM_TOKEN)?,
            key,
        })
    }

    /// Whether a non-empty AppK is stored.
    pub fn has_appk(&self) -> bool {
        self.appk.as_ref().is_some_and(|appk| !appk.is_empty())
    }
}

impl fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("DeviceRecord")
            .field("key", &self.key.to_string())
            .field("device_id", &self.device_id)
            .field("adoption_id", &self.adoption_id)
            .field(
                "appk",
                &self
                    .appk
                    .as_deref()
                    .map(|appk| format!("sha256:{}", appk_fingerprint(appk))),
            )
            .field("auth_tokens", &redacted(&self.auth_tokens))
            .field("main_key", &redacted(&self.main_key))
            .field("trusted", &self.trusted)
            .field("created", &self.created)
            .field("challenge", &self.challenge)
            .field("registered", &self.registered)
            .field("fcm_token", &self.fcm_token)
            .finish()
    }
}

struct CellDecoder<'a> {
    row: &'a Row,
}

impl CellDecoder<'_> {
    fn malformed(&self, column: &str, reason: impl Into<String>) -> RegistryError {
        RegistryError::MalformedField {
            key: self.row.key().to_string(),
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    fn text(&self, family: &str, column: &str) -> Result<Option<String>, RegistryError> {
        self.row
            .value(family, column)
            .map(|bytes| {
                String::from_utf8(bytes.to_vec()).map_err(|e| self.malformed(column, e.to_string()))
            })
            .transpose()
    }

    /// Text value with empty cells treated as missing.
    fn non_empty(&self, family: &str, column: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.text(family, column)?.filter(|value| !value.trim().is_empty()))
    }

    fn flag(&self, family: &str, column: &str) -> Result<Option<bool>, RegistryError> {
        match self.non_empty(family, column)?.as_deref().map(str::trim) {
            None => Ok(None),
            Some("true") | Some("1") => Ok(Some(true)),
            Some("false") | Some("0") => Ok(Some(false)),
            Some(other) => Err(self.malformed(column, format!("'{}' is not a boolean", other))),
        }
    }

    fn timestamp(
        &self,
        family: &str,
        column: &str,
    ) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let Some(value) = self.non_empty(family, column)? else {
            return Ok(None);
        };
        match parse_timestamp(value.trim()) {
            Ok(parsed) => Ok(Some(parsed)),
            Err(TimestampError::UnknownZone(zone)) => {
                warn!(
                    "Ignoring {} of {}: unknown time zone '{}' in '{}'",
                    column,
                    self.row.key(),
                    zone,
                    value
                );
                Ok(None)
            }
            Err(TimestampError::Invalid(reason)) => Err(self.malformed(column, reason)),
        }
    }
}

enum TimestampError {
    UnknownZone(String),
    Invalid(String),
}

/// UTC offset in seconds of the zone abbreviations the provisioning hosts
/// write.
fn zone_offset(zone: &str) -> Option<i32> {
    const HOUR: i32 = 3600;
    let offset = match zone {
        "UTC" | "GMT" | "Z" | "WET" => 0,
        "BST" | "CET" | "WEST" => HOUR,
        "CEST" | "EET" => 2 * HOUR,
        "EEST" | "MSK" => 3 * HOUR,
        "IST" => 5 * HOUR + 30 * 60,
        "CST" => -6 * HOUR,
        "CDT" | "EST" => -5 * HOUR,
        "EDT" => -4 * HOUR,
        "MST" => -7 * HOUR,
        "MDT" => -6 * HOUR,
        "PST" => -8 * HOUR,
        "PDT" => -7 * HOUR,
        "JST" => 9 * HOUR,
        "AEST" => 10 * HOUR,
        "AEDT" => 11 * HOUR,
        _ => return None,
    };
    Some(offset)
}

/// Parses RFC 3339, or the Unix `date` layout (`Mon Jan  2 15:04:05 MST 2006`)
/// written in the provisioning host's local zone.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let parts: Vec<&str> = value.split_whitespace().collect();
    let [weekday, month, day, time, zone, year] = parts.as_slice() else {
        return Err(TimestampError::Invalid(format!("'{}' is not a timestamp", value)));
    };

    let naive = format!("{weekday} {month} {day} {time} {year}");
    let naive = NaiveDateTime::parse_from_str(&naive, "%a %b %d %H:%M:%S %Y")
        .map_err(|e| TimestampError::Invalid(format!("'{}': {}", value, e)))?;

    let offset = zone_offset(zone)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| TimestampError::UnknownZone(zone.to_string()))?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok_or_else(|| TimestampError::Invalid(format!("'{}' is out of range", value)))
}
