//! Registration pool access
//!
//! Resolves the pairing and registration state of a device identity stored
//! in a wide-column table keyed by `AID#QID#DID`.
//!
//! # Features
//!
//! - Key codec: `parse_rp_key`, `compose_key` and the typed `RowKey`
//! - Pairing resolution of an AID to its row key
//! - AppK reads that tell a missing key apart from a store failure
//! - Classification into `RegistrationState`
//!
//! # Example
//!
//! ```rust,no_run
//! use regpool_access::{RegistrationPool, RegistrationState};
//! use regpool_db::{CallContext, MemoryRowStore};
//! use std::time::Duration;
//!
//! async fn may_register(pool: &RegistrationPool<MemoryRowStore>, aid: &str) -> bool {
//!     let ctx = CallContext::with_timeout(Duration::from_secs(2));
//!     matches!(
//!         pool.registration_state(&ctx, aid).await,
//!         RegistrationState::PairedUnregistered { .. }
//!     )
//! }
//! ```

pub mod error;
pub mod key;
pub mod pool;
pub mod record;
pub mod schema;
pub mod state;

pub use error::RegistryError;
pub use key::{compose_key, parse_rp_key, RowKey};
pub use pool::RegistrationPool;
pub use record::{appk_fingerprint, DeviceRecord};
pub use schema::DeviceEntry;
pub use state::{Classification, RegistrationState};
