//! Store client trait definition.
//!
//! [`StoreClient`] is the narrow surface the reconcilers need from a
//! distributed, linearizable key-value store:
//!
//! - **Point reads**: look up the value(s) currently stored under a key
//! - **Conditional transactions**: atomic compare→write via [`Txn`]
//! - **User management**: create and delete store-native credentials
//!
//! Implementations own the connection and must be safe to share across
//! concurrent callers (`Send + Sync`). Callers hold them behind an `Arc` and
//! never mutate them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::StoreResult,
    txn::{Txn, TxnResponse},
    types::{Credential, KeyValue},
};

/// Connection to the store.
///
/// | Method | Description |
/// |--------|-------------|
/// | [`get`](StoreClient::get) | Read the entries stored under a key |
/// | [`transact`](StoreClient::transact) | Apply a conditional transaction |
/// | [`create_user`](StoreClient::create_user) | Register a user credential |
/// | [`delete_user`](StoreClient::delete_user) | Remove a user credential |
/// | [`health_check`](StoreClient::health_check) | Verify the cluster answers |
///
/// # Example
///
/// ```
/// use etcd_provider_store::{Compare, MemoryStore, StoreClient, Txn, TxnOp};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let store = MemoryStore::new();
///
/// let txn = Txn::new().when(Compare::key_missing("k")).and_then(TxnOp::put("k", "v"));
/// assert!(store.transact(txn).await.unwrap().succeeded);
///
/// let kvs = store.get(b"k").await.unwrap();
/// assert_eq!(kvs[0].value.as_ref(), b"v");
/// # });
/// ```
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Reads the entries stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(vec)` with one entry if the key exists
    /// - `Ok(vec![])` if the key doesn't exist
    /// - `Err(...)` on store errors; an empty key is
    ///   [`InvalidArgument`](crate::StoreError::InvalidArgument)
    #[must_use = "store operations may fail and errors must be handled"]
    async fn get(&self, key: &[u8]) -> StoreResult<Vec<KeyValue>>;

    /// Atomically evaluates the transaction's compares and, if they all hold,
    /// applies its success operations.
    ///
    /// A failed compare is not an error: the response reports
    /// `succeeded == false` and nothing is written.
    ///
    /// # Errors
    ///
    /// - [`InvalidArgument`](crate::StoreError::InvalidArgument) if any key is empty
    /// - [`Connection`](crate::StoreError::Connection) /
    ///   [`Rejected`](crate::StoreError::Rejected) on cluster failures
    #[must_use = "store operations may fail and errors must be handled"]
    async fn transact(&self, txn: Txn) -> StoreResult<TxnResponse>;

    /// Registers a new user credential.
    ///
    /// # Errors
    ///
    /// - [`Conflict`](crate::StoreError::Conflict) if the username is taken
    /// - [`InvalidArgument`](crate::StoreError::InvalidArgument) if the username is empty
    #[must_use = "store operations may fail and errors must be handled"]
    async fn create_user(&self, credential: &Credential) -> StoreResult<()>;

    /// Removes a user credential.
    ///
    /// # Errors
    ///
    /// - [`NotFound`](crate::StoreError::NotFound) if no such user exists
    #[must_use = "store operations may fail and errors must be handled"]
    async fn delete_user(&self, username: &str) -> StoreResult<()>;

    /// Checks that the cluster is reachable and serving requests.
    #[must_use = "health check results indicate store availability and must be inspected"]
    async fn health_check(&self) -> StoreResult<()>;
}

#[async_trait]
impl<S: StoreClient + ?Sized> StoreClient for Arc<S> {
    async fn get(&self, key: &[u8]) -> StoreResult<Vec<KeyValue>> {
        (**self).get(key).await
    }

    async fn transact(&self, txn: Txn) -> StoreResult<TxnResponse> {
        (**self).transact(txn).await
    }

    async fn create_user(&self, credential: &Credential) -> StoreResult<()> {
        (**self).create_user(credential).await
    }

    async fn delete_user(&self, username: &str) -> StoreResult<()> {
        (**self).delete_user(username).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        (**self).health_check().await
    }
}
