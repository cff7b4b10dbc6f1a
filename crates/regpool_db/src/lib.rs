//! Row store gateway for the registration pool
//!
//! This crate defines the narrow contract the registration pool needs from a
//! wide-column store, plus two implementations of it.
//!
//! # Features
//!
//! - `RowStoreGateway`: prefix scans and point reads with family/column
//!   projection, and point writes that replace cells
//! - `CallContext`: caller deadline threaded through every store call
//! - `MemoryRowStore`: ordered in-process store
//! - `SqlRowStore`: cells table over an SQLx pool on SQLite
//!
//! # Example
//!
//! ```rust,no_run
//! use regpool_db::{CallContext, MemoryRowStore, Mutation, RowFilter, RowStoreGateway};
//!
//! async fn first_row() -> Result<(), regpool_db::StoreError> {
//!     let store = MemoryRowStore::new();
//!     let ctx = CallContext::background();
//!     store
//!         .apply(&ctx, "aid-1#qid-1#did-1", &Mutation::new().set("DeviceProperties", "DeviceId", "did-1"))
//!         .await?;
//!     let row = store.read_by_prefix(&ctx, "aid-1#", &RowFilter::all()).await?;
//!     assert_eq!(row.map(|r| r.key().to_string()), Some("aid-1#qid-1#did-1".to_string()));
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod factory;
pub mod gateway;
pub mod row;
pub mod stores;

pub use client::DbClient;
pub use context::CallContext;
pub use error::StoreError;
pub use factory::{DbClientFactory, RowStoreFactory};
pub use gateway::RowStoreGateway;
pub use row::{Cell, Mutation, MutationOp, Row, RowFilter};
pub use stores::{ConfiguredRowStore, MemoryRowStore, SqlRowStore};
