//! Conformance test suite for [`StoreClient`] implementations.
//!
//! Every store the reconcilers run against must satisfy the same contract:
//! existence-conditioned transactions that are atomic and linearizable,
//! distinct errors for duplicate and missing users, and empty keys rejected
//! as invalid. The in-memory store and the etcd-backed store both run this
//! suite.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each function with a fresh store.
//! Functions taking a `prefix` only touch keys and users under that prefix,
//! so a shared live cluster can be used.
//!
//! ```no_run
//! use etcd_provider_store::{MemoryStore, conformance};
//!
//! #[tokio::test]
//! async fn txn_create_if_missing() {
//!     conformance::txn_create_if_missing(&MemoryStore::new(), "t1").await;
//! }
//! ```

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    client::StoreClient,
    error::StoreError,
    txn::{Compare, Txn, TxnOp},
    types::Credential,
};

fn key(prefix: &str, name: &str) -> Bytes {
    Bytes::from(format!("{prefix}/{name}"))
}

fn create_txn(key: &Bytes, value: &'static str) -> Txn {
    Txn::new().when(Compare::KeyMissing(key.clone())).and_then(TxnOp::put(key.clone(), value))
}

fn delete_txn(key: &Bytes) -> Txn {
    Txn::new().when(Compare::KeyExists(key.clone())).and_then(TxnOp::delete(key.clone()))
}

// ============================================================================
// Reads
// ============================================================================

/// `get` on a missing key returns no entries.
pub async fn get_missing_key_is_empty<S: StoreClient>(store: &S, prefix: &str) {
    let kvs = store.get(&key(prefix, "missing")).await.expect("get should not fail");
    assert!(kvs.is_empty(), "missing key should yield no entries, got {kvs:?}");
}

/// `get` with an empty key is rejected as an invalid argument.
pub async fn get_empty_key_is_invalid<S: StoreClient>(store: &S) {
    let result = store.get(b"").await;
    assert!(
        matches!(result, Err(StoreError::InvalidArgument { .. })),
        "empty key should be InvalidArgument, got {result:?}"
    );
}

// ============================================================================
// Transactions
// ============================================================================

/// A key-missing guarded put succeeds once and is then visible.
pub async fn txn_create_if_missing<S: StoreClient>(store: &S, prefix: &str) {
    let k = key(prefix, "create");
    let response = store.transact(create_txn(&k, "v1")).await.expect("transact");
    assert!(response.succeeded, "create on missing key should succeed");

    let kvs = store.get(&k).await.expect("get");
    assert_eq!(kvs.len(), 1);
    assert_eq!(kvs[0].value, Bytes::from("v1"));
    assert_eq!(kvs[0].key, k);
}

/// A second key-missing guarded put fails and leaves the first value intact.
pub async fn txn_create_on_existing_fails<S: StoreClient>(store: &S, prefix: &str) {
    let k = key(prefix, "dup");
    assert!(store.transact(create_txn(&k, "first")).await.expect("first").succeeded);

    let response = store.transact(create_txn(&k, "second")).await.expect("second");
    assert!(!response.succeeded, "create on existing key must not succeed");

    let kvs = store.get(&k).await.expect("get");
    assert_eq!(kvs[0].value, Bytes::from("first"), "original value must be untouched");
}

/// A key-exists guarded delete succeeds once, then reports a failed compare.
pub async fn txn_delete_if_exists<S: StoreClient>(store: &S, prefix: &str) {
    let k = key(prefix, "delete");
    assert!(store.transact(create_txn(&k, "v")).await.expect("create").succeeded);

    assert!(store.transact(delete_txn(&k)).await.expect("delete").succeeded);
    assert!(store.get(&k).await.expect("get").is_empty(), "key should be gone");

    let again = store.transact(delete_txn(&k)).await.expect("second delete");
    assert!(!again.succeeded, "delete of absent key should fail its compare");
}

/// Revisions advance with each successful write.
pub async fn txn_revisions_advance<S: StoreClient>(store: &S, prefix: &str) {
    let k = key(prefix, "rev");
    let first = store.transact(create_txn(&k, "v")).await.expect("create");
    let second = store.transact(delete_txn(&k)).await.expect("delete");
    assert!(second.revision > first.revision, "revision must advance: {first:?} -> {second:?}");
}

/// A transaction touching an empty key is rejected as an invalid argument.
pub async fn txn_empty_key_is_invalid<S: StoreClient>(store: &S) {
    let result = store.transact(create_txn(&Bytes::new(), "v")).await;
    assert!(
        matches!(result, Err(StoreError::InvalidArgument { .. })),
        "empty key should be InvalidArgument, got {result:?}"
    );
}

/// Racing key-missing guarded puts on one key: exactly one succeeds.
pub async fn txn_concurrent_creates_single_winner<S>(store: Arc<S>, prefix: &str, contenders: usize)
where
    S: StoreClient + 'static,
{
    let k = key(prefix, "race");
    let mut tasks = tokio::task::JoinSet::new();
    for task in 0..contenders {
        let store = Arc::clone(&store);
        let k = k.clone();
        tasks.spawn(async move {
            let value = Bytes::from(format!("task{task}"));
            let txn =
                Txn::new().when(Compare::KeyMissing(k.clone())).and_then(TxnOp::put(k, value));
            store.transact(txn).await.map(|r| r.succeeded)
        });
    }

    let mut winners = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.expect("task should not panic").expect("transact should not fail") {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one create should win");

    let kvs = store.get(&k).await.expect("get");
    let value = String::from_utf8(kvs[0].value.to_vec()).expect("utf-8");
    assert!(value.starts_with("task"), "value must come from a single writer, got {value}");
}

// ============================================================================
// Users
// ============================================================================

/// Creating a user twice conflicts; deleting it twice reports not found.
pub async fn user_lifecycle<S: StoreClient>(store: &S, prefix: &str) {
    let credential = Credential::new(format!("{prefix}-user"), "conformance-password");

    store.create_user(&credential).await.expect("first create");
    let duplicate = store.create_user(&credential).await;
    assert!(
        matches!(duplicate, Err(StoreError::Conflict)),
        "duplicate user should be Conflict, got {duplicate:?}"
    );

    store.delete_user(credential.username()).await.expect("first delete");
    let missing = store.delete_user(credential.username()).await;
    assert!(
        matches!(missing, Err(StoreError::NotFound { .. })),
        "deleting an absent user should be NotFound, got {missing:?}"
    );
}

/// The store reports healthy.
pub async fn health_check_succeeds<S: StoreClient>(store: &S) {
    store.health_check().await.expect("health check should pass");
}
