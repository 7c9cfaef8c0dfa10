//! Key/value entry reconciliation.
//!
//! Each verb is a single exchange with the store:
//!
//! | Verb | Store call | Precondition failure means |
//! |------|-----------|-----------------------------|
//! | create | `txn(if key missing: put)` | [`TransactionConflict`](ReconcileError::TransactionConflict) |
//! | read | `get(key)` | n/a |
//! | delete | `txn(if key exists: delete)` | already absent, success |
//!
//! No local cache is kept; existence is decided by the store on every call.

use std::sync::Arc;

use bytes::Bytes;
use etcd_provider_store::{Compare, KeyValue, StoreClient, Txn, TxnOp};

use crate::{
    context::OperationContext,
    error::{Operation, ReconcileError, ReconcileResult, ResourceKind},
    outcome::{DeleteOutcome, ReadOutcome},
    policy,
    schema::{KEY_VALUE_SCHEMA, ResourceSchema},
};

/// Declared configuration of a key/value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueConfig {
    /// Key to create. Must not be empty.
    pub key: Bytes,
    /// Value to store. May be empty.
    pub value: Bytes,
}

impl KeyValueConfig {
    /// Creates a configuration.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Observed state of a key/value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueState {
    /// Resource identity: the key, rendered as text.
    pub id: String,
    /// The key.
    pub key: Bytes,
    /// The value currently stored.
    pub value: Bytes,
    /// Store revision of the last write to the key.
    pub mod_revision: i64,
}

impl KeyValueState {
    fn observed(kv: KeyValue) -> Self {
        Self { id: identity(&kv.key), key: kv.key, value: kv.value, mod_revision: kv.mod_revision }
    }
}

fn identity(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

/// Reconciles key/value entries against a shared store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use etcd_provider_reconcile::{KeyValueConfig, KeyValueReconciler, OperationContext};
/// use etcd_provider_store::MemoryStore;
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let reconciler = KeyValueReconciler::new(Arc::new(MemoryStore::new()));
/// let ctx = OperationContext::new();
///
/// let state = reconciler.create(&ctx, &KeyValueConfig::new("app/mode", "blue")).await.unwrap();
/// assert_eq!(state.id, "app/mode");
/// # });
/// ```
pub struct KeyValueReconciler<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for KeyValueReconciler<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: ?Sized> std::fmt::Debug for KeyValueReconciler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyValueReconciler").finish_non_exhaustive()
    }
}

impl<S: StoreClient + ?Sized> KeyValueReconciler<S> {
    /// Creates a reconciler over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The declared schema of key/value entries.
    #[must_use]
    pub fn schema(&self) -> &'static ResourceSchema {
        &KEY_VALUE_SCHEMA
    }

    /// Creates the entry if, and only if, the key is absent.
    ///
    /// # Errors
    ///
    /// - [`InvalidInput`](ReconcileError::InvalidInput) for an empty key, before any store call
    /// - [`TransactionConflict`](ReconcileError::TransactionConflict) if the key already exists;
    ///   the stored value is left untouched
    /// - [`ClientCancelled`](ReconcileError::ClientCancelled) /
    ///   [`DeadlineExceeded`](ReconcileError::DeadlineExceeded) if `ctx` fires first
    /// - [`ClusterUnreachable`](ReconcileError::ClusterUnreachable) on cluster failures
    #[tracing::instrument(
        name = "key_value_create",
        skip(self, ctx, config),
        fields(key = %String::from_utf8_lossy(&config.key), value_len = config.value.len())
    )]
    pub async fn create(
        &self,
        ctx: &OperationContext,
        config: &KeyValueConfig,
    ) -> ReconcileResult<KeyValueState> {
        policy::validate_key(&config.key)?;
        let id = identity(&config.key);

        let txn = Txn::new()
            .when(Compare::key_missing(config.key.clone()))
            .and_then(TxnOp::put(config.key.clone(), config.value.clone()));

        let response = ctx
            .run(Operation::Create, async {
                self.store.transact(txn).await.map_err(|err| {
                    ReconcileError::from_store(err, Operation::Create, ResourceKind::KeyValue, &id)
                })
            })
            .await
            .inspect_err(|err| err.log_failure("create"))?;

        if !response.succeeded {
            tracing::warn!("key already exists");
            return Err(ReconcileError::TransactionConflict { kind: ResourceKind::KeyValue, id });
        }

        tracing::debug!(revision = response.revision, "key created");
        Ok(KeyValueState {
            id,
            key: config.key.clone(),
            value: config.value.clone(),
            mod_revision: response.revision,
        })
    }

    /// Looks the key up.
    ///
    /// # Errors
    ///
    /// - [`InvalidInput`](ReconcileError::InvalidInput) for an empty key
    /// - [`ClientCancelled`](ReconcileError::ClientCancelled) /
    ///   [`DeadlineExceeded`](ReconcileError::DeadlineExceeded) if `ctx` fires first
    /// - [`ClusterUnreachable`](ReconcileError::ClusterUnreachable) on cluster failures
    #[tracing::instrument(
        name = "key_value_read",
        skip(self, ctx, key),
        fields(key = %String::from_utf8_lossy(key))
    )]
    pub async fn read(
        &self,
        ctx: &OperationContext,
        key: &[u8],
    ) -> ReconcileResult<ReadOutcome<KeyValueState>> {
        policy::validate_key(key)?;
        let id = identity(key);

        let kvs = ctx
            .run(Operation::Read, async {
                self.store.get(key).await.map_err(|err| {
                    ReconcileError::from_store(err, Operation::Read, ResourceKind::KeyValue, &id)
                })
            })
            .await
            .inspect_err(|err| err.log_failure("read"))?;

        match kvs.into_iter().next() {
            Some(kv) => {
                tracing::debug!(revision = kv.mod_revision, "key present");
                Ok(ReadOutcome::Present(KeyValueState::observed(kv)))
            },
            None => {
                tracing::info!("key absent, dropping from state");
                Ok(ReadOutcome::Absent)
            },
        }
    }

    /// Deletes the key if it is present. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// - [`InvalidInput`](ReconcileError::InvalidInput) for an empty key
    /// - [`ClientCancelled`](ReconcileError::ClientCancelled) /
    ///   [`DeadlineExceeded`](ReconcileError::DeadlineExceeded) if `ctx` fires first
    /// - [`ClusterUnreachable`](ReconcileError::ClusterUnreachable) on cluster failures
    #[tracing::instrument(
        name = "key_value_delete",
        skip(self, ctx, key),
        fields(key = %String::from_utf8_lossy(key))
    )]
    pub async fn delete(
        &self,
        ctx: &OperationContext,
        key: &[u8],
    ) -> ReconcileResult<DeleteOutcome> {
        policy::validate_key(key)?;
        let id = identity(key);

        let txn = Txn::new()
            .when(Compare::key_exists(Bytes::copy_from_slice(key)))
            .and_then(TxnOp::delete(Bytes::copy_from_slice(key)));

        let result = ctx
            .run(Operation::Delete, async {
                self.store.transact(txn).await.map_err(|err| {
                    ReconcileError::from_store(err, Operation::Delete, ResourceKind::KeyValue, &id)
                })
            })
            .await;

        match result {
            Ok(response) if response.succeeded => {
                tracing::debug!(revision = response.revision, "key deleted");
                Ok(DeleteOutcome::Deleted)
            },
            Ok(_)
            | Err(
                ReconcileError::TransactionConflict { .. } | ReconcileError::NotFound { .. },
            ) => {
                tracing::info!("key already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            },
            Err(err) => {
                err.log_failure("delete");
                Err(err)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use etcd_provider_store::{
        MemoryStore,
        testutil::{RecordingStore, UnreachableStore},
    };

    use super::*;
    use crate::error::FailureOrigin;

    fn reconciler() -> (Arc<MemoryStore>, KeyValueReconciler<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), KeyValueReconciler::new(store))
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let (_, kv) = reconciler();
        let ctx = OperationContext::new();

        let created = kv.create(&ctx, &KeyValueConfig::new("k", "v")).await;
        let Ok(created) = created else { unreachable!("create failed: {created:?}") };
        assert_eq!(created.id, "k");

        let read = kv.read(&ctx, b"k").await.ok().and_then(ReadOutcome::into_present);
        assert_eq!(read, Some(created));
    }

    #[tokio::test]
    async fn test_second_create_conflicts_and_keeps_value() {
        let (store, kv) = reconciler();
        let ctx = OperationContext::new();

        assert!(kv.create(&ctx, &KeyValueConfig::new("k", "first")).await.is_ok());
        let second = kv.create(&ctx, &KeyValueConfig::new("k", "second")).await;
        let Err(ReconcileError::TransactionConflict { kind, id }) = second else {
            unreachable!("expected conflict, got {second:?}");
        };
        assert_eq!((kind, id.as_str()), (ResourceKind::KeyValue, "k"));

        let stored = store.get(b"k").await.unwrap_or_default();
        assert_eq!(stored[0].value.as_ref(), b"first");
    }

    #[tokio::test]
    async fn test_empty_value_is_allowed() {
        let (_, kv) = reconciler();
        let ctx = OperationContext::new();

        assert!(kv.create(&ctx, &KeyValueConfig::new("k", "")).await.is_ok());
        let read = kv.read(&ctx, b"k").await.ok().and_then(ReadOutcome::into_present);
        assert_eq!(read.map(|s| s.value), Some(Bytes::new()));
    }

    #[tokio::test]
    async fn test_empty_key_rejected_without_store_call() {
        let store = Arc::new(RecordingStore::new());
        let kv = KeyValueReconciler::new(Arc::clone(&store));
        let ctx = OperationContext::new();

        let result = kv.create(&ctx, &KeyValueConfig::new("", "v")).await;
        let field = result.err().and_then(|e| e.attribute().map(str::to_owned));
        assert_eq!(field.as_deref(), Some("key"));
        assert!(kv.read(&ctx, b"").await.is_err());
        assert!(kv.delete(&ctx, b"").await.is_err());
        assert_eq!(store.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, kv) = reconciler();
        let ctx = OperationContext::new();

        assert!(kv.create(&ctx, &KeyValueConfig::new("k", "v")).await.is_ok());
        assert_eq!(kv.delete(&ctx, b"k").await.ok(), Some(DeleteOutcome::Deleted));
        assert_eq!(kv.delete(&ctx, b"k").await.ok(), Some(DeleteOutcome::AlreadyAbsent));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_read_absent_key() {
        let (_, kv) = reconciler();
        let outcome = kv.read(&OperationContext::new(), b"missing").await;
        assert!(outcome.is_ok_and(|o| o.is_absent()));
    }

    #[tokio::test]
    async fn test_read_reports_mod_revision_of_create() {
        let (_, kv) = reconciler();
        let ctx = OperationContext::new();

        assert!(kv.create(&ctx, &KeyValueConfig::new("other", "x")).await.is_ok());
        let created = kv.create(&ctx, &KeyValueConfig::new("k", "v")).await;
        let read = kv.read(&ctx, b"k").await.ok().and_then(ReadOutcome::into_present);
        assert_eq!(created.ok().map(|s| s.mod_revision), read.map(|s| s.mod_revision));
    }

    #[tokio::test]
    async fn test_unreachable_cluster_is_endpoint_failure() {
        let kv = KeyValueReconciler::new(Arc::new(UnreachableStore::new("http://10.0.0.1:2379")));
        let ctx = OperationContext::new();

        let create = kv.create(&ctx, &KeyValueConfig::new("k", "v")).await;
        assert_eq!(create.err().and_then(|e| e.origin()), Some(FailureOrigin::Endpoint));

        // Delete does not swallow cluster failures
        let delete = kv.delete(&ctx, b"k").await;
        assert_eq!(delete.err().and_then(|e| e.origin()), Some(FailureOrigin::Endpoint));
    }
}
