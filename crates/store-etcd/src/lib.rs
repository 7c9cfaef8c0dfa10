//! etcd v3 backend for the etcd-provider store client.
//!
//! This crate provides [`EtcdStore`], an implementation of
//! [`StoreClient`](etcd_provider_store::StoreClient) that talks to a real
//! etcd cluster over gRPC.
//!
//! # Error Mapping
//!
//! | etcd / gRPC condition | `StoreError` |
//! |-----------------------|--------------|
//! | transport failure, bad URI, I/O error, `Unavailable` | `Connection` |
//! | `InvalidArgument`, `OutOfRange` | `InvalidArgument` |
//! | user already exists | `Conflict` |
//! | user not found | `NotFound` |
//! | `DeadlineExceeded`, request timeout expired | `Timeout` |
//! | `Cancelled` | `Cancelled` |
//! | auth failures and other `etcdserver:` errors | `Rejected` |
//! | any other status (the endpoint is not an etcd server) | `Connection` |
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use etcd_provider_store::{Compare, StoreClient, Txn, TxnOp};
//! use etcd_provider_store_etcd::{EtcdStore, EtcdStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EtcdStoreConfig::builder()
//!         .endpoints(["http://127.0.0.1:2379"])
//!         .dial_timeout(Duration::from_secs(2))
//!         .build()?;
//!     let store = EtcdStore::connect(&config).await?;
//!
//!     let txn = Txn::new()
//!         .when(Compare::key_missing("service/port"))
//!         .and_then(TxnOp::put("service/port", "8080"));
//!     let created = store.transact(txn).await?.succeeded;
//!     println!("created: {created}");
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

mod config;
mod error;
mod store;

pub use config::{DEFAULT_DIAL_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, EtcdStoreConfig};
pub use error::{EtcdStoreError, Result};
pub use store::EtcdStore;
