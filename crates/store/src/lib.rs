//! Store client abstraction for etcd resource reconciliation.
//!
//! This crate provides the [`StoreClient`] trait that the reconcilers use to
//! talk to a distributed, linearizable key-value store, together with the
//! transaction and error types that trait speaks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Resource lifecycle transport                │
//! │           (create / read / delete per resource type)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  etcd-provider-reconcile                    │
//! │        KeyValueReconciler │ UserReconciler │ Registry       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    etcd-provider-store                      │
//! │                     StoreClient trait                       │
//! │   (get, transact, create_user, delete_user, health_check)   │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryStore  │              EtcdStore                       │
//! │  (testing)   │     (etcd-provider-store-etcd, production)   │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use etcd_provider_store::{Compare, MemoryStore, StoreClient, Txn, TxnOp};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryStore::new();
//!
//!     // Create the key only if it does not exist yet
//!     let txn = Txn::new()
//!         .when(Compare::key_missing("service/port"))
//!         .and_then(TxnOp::put("service/port", "8080"));
//!     let response = store.transact(txn).await?;
//!     assert!(response.succeeded);
//!
//!     let kvs = store.get(b"service/port").await?;
//!     assert_eq!(kvs[0].value.as_ref(), b"8080");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module (collaborator doubles, assertion macros) and
//!   the `conformance` suite. Enable this in `[dev-dependencies]` for integration tests.
//! - **`failpoints`**: Activates the fail points in [`MemoryStore`].

#![deny(unsafe_code)]

pub mod client;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod txn;
pub mod types;

// Re-export primary types at crate root for convenience
pub use client::StoreClient;
pub use error::{BoxError, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use txn::{Compare, Txn, TxnOp, TxnResponse};
pub use types::{Credential, KeyValue};
pub use zeroize::Zeroizing;
