//! Idempotent reconciliation of etcd key/value entries and users.
//!
//! This crate turns declared resources into conditional operations against a
//! [`StoreClient`](etcd_provider_store::StoreClient):
//!
//! - [`KeyValueReconciler`]: creates a key only if it is absent, reads it
//!   back, deletes it only if it is present
//! - [`UserReconciler`]: validates and registers user credentials, removes
//!   them idempotently
//! - [`ResourceRegistry`]: dispatches the lifecycle verbs by resource type
//!   name, decoding untyped attributes and reporting [`Diagnostics`]
//!
//! Correctness under concurrent writers rests entirely on the store's
//! condition→action transactions; the reconcilers hold no lock and no cache.
//!
//! # Cancellation
//!
//! Every verb takes an [`OperationContext`]. A context that is already
//! cancelled or past its deadline fails before the store is called; one that
//! fires mid-call drops the in-flight request.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use etcd_provider_reconcile::{
//!     KeyValueConfig, KeyValueReconciler, OperationContext, ReadOutcome, ReconcileError,
//! };
//! use etcd_provider_store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reconciler = KeyValueReconciler::new(Arc::new(MemoryStore::new()));
//!     let ctx = OperationContext::new();
//!
//!     reconciler.create(&ctx, &KeyValueConfig::new("feature/x", "on")).await?;
//!
//!     // A second create conflicts instead of overwriting
//!     let again = reconciler.create(&ctx, &KeyValueConfig::new("feature/x", "off")).await;
//!     assert!(matches!(again, Err(ReconcileError::TransactionConflict { .. })));
//!
//!     match reconciler.read(&ctx, b"feature/x").await? {
//!         ReadOutcome::Present(state) => assert_eq!(state.value.as_ref(), b"on"),
//!         ReadOutcome::Absent => unreachable!(),
//!     }
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

pub mod context;
pub mod diagnostics;
pub mod error;
pub mod key_value;
pub mod outcome;
pub mod policy;
pub mod registry;
pub mod request;
pub mod schema;
pub mod user;

pub use context::OperationContext;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{FailureOrigin, Operation, ReconcileError, ReconcileResult, ResourceKind};
pub use key_value::{KeyValueConfig, KeyValueReconciler, KeyValueState};
pub use outcome::{DeleteOutcome, ReadOutcome};
pub use policy::MIN_PASSWORD_LENGTH;
pub use registry::{PlanAction, ResourceRegistry, ResourceState};
pub use request::Attributes;
pub use schema::{AttributeSchema, ResourceSchema};
pub use tokio_util::sync::CancellationToken;
pub use user::{UserConfig, UserReconciler, UserState};
