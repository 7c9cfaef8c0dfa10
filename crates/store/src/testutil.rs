//! Shared test utilities for store clients and their callers.
//!
//! This module provides collaborator doubles, test data helpers and assertion
//! macros. It is feature-gated behind `testutil` to prevent leaking into
//! production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! etcd-provider-store = { path = "../store", features = ["testutil"] }
//! ```
//!
//! # Doubles
//!
//! | Double | Behaviour |
//! |--------|-----------|
//! | [`RecordingStore`] | Delegates to an inner store and counts calls per method |
//! | [`UnreachableStore`] | Fails every call with [`StoreError::Connection`] |
//! | [`RejectingStore`] | Fails every call with [`StoreError::Rejected`] |
//! | [`StalledStore`] | Never completes any call |

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{
    client::StoreClient,
    error::{StoreError, StoreResult},
    memory::MemoryStore,
    txn::{Txn, TxnResponse},
    types::{Credential, KeyValue},
};

/// Create a deterministic test key from a prefix and index.
///
/// Produces keys like `"prefix/000042"` encoded as UTF-8 bytes.
#[must_use]
pub fn make_key(prefix: &str, idx: usize) -> Vec<u8> {
    format!("{prefix}/{idx:06}").into_bytes()
}

/// Create a test value tagged with a task ID.
///
/// Produces values like `"task3"`; useful in races to tell which task won.
#[must_use]
pub fn make_tagged_value(task: usize) -> Vec<u8> {
    format!("task{task}").into_bytes()
}

/// Per-method call counters recorded by [`RecordingStore`].
#[derive(Debug, Default)]
pub struct CallCounts {
    get: AtomicUsize,
    transact: AtomicUsize,
    create_user: AtomicUsize,
    delete_user: AtomicUsize,
    health_check: AtomicUsize,
}

impl CallCounts {
    /// Number of `get` calls.
    pub fn get(&self) -> usize {
        self.get.load(Ordering::SeqCst)
    }

    /// Number of `transact` calls.
    pub fn transact(&self) -> usize {
        self.transact.load(Ordering::SeqCst)
    }

    /// Number of `create_user` calls.
    pub fn create_user(&self) -> usize {
        self.create_user.load(Ordering::SeqCst)
    }

    /// Number of `delete_user` calls.
    pub fn delete_user(&self) -> usize {
        self.delete_user.load(Ordering::SeqCst)
    }

    /// Number of `health_check` calls.
    pub fn health_check(&self) -> usize {
        self.health_check.load(Ordering::SeqCst)
    }

    /// Total number of calls of any kind.
    pub fn total(&self) -> usize {
        self.get() + self.transact() + self.create_user() + self.delete_user() + self.health_check()
    }
}

/// A store double that records every call before delegating to `inner`.
///
/// Use it to prove that validation failures never reach the network.
#[derive(Debug, Clone)]
pub struct RecordingStore<S = MemoryStore> {
    inner: S,
    calls: Arc<CallCounts>,
}

impl RecordingStore<MemoryStore> {
    /// Wraps a fresh [`MemoryStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::wrap(MemoryStore::new())
    }
}

impl Default for RecordingStore<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RecordingStore<S> {
    /// Wraps an existing store.
    pub fn wrap(inner: S) -> Self {
        Self { inner, calls: Arc::new(CallCounts::default()) }
    }

    /// The recorded call counters.
    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: StoreClient> StoreClient for RecordingStore<S> {
    async fn get(&self, key: &[u8]) -> StoreResult<Vec<KeyValue>> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn transact(&self, txn: Txn) -> StoreResult<TxnResponse> {
        self.calls.transact.fetch_add(1, Ordering::SeqCst);
        self.inner.transact(txn).await
    }

    async fn create_user(&self, credential: &Credential) -> StoreResult<()> {
        self.calls.create_user.fetch_add(1, Ordering::SeqCst);
        self.inner.create_user(credential).await
    }

    async fn delete_user(&self, username: &str) -> StoreResult<()> {
        self.calls.delete_user.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_user(username).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.calls.health_check.fetch_add(1, Ordering::SeqCst);
        self.inner.health_check().await
    }
}

/// A store whose endpoints are unusable: every call is a connection failure.
#[derive(Debug, Clone)]
pub struct UnreachableStore {
    endpoint: String,
}

impl UnreachableStore {
    /// Creates a double that reports `endpoint` as unreachable.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }

    fn error(&self) -> StoreError {
        StoreError::connection_with_source(
            format!("failed to connect to {}", self.endpoint),
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
        )
    }
}

#[async_trait]
impl StoreClient for UnreachableStore {
    async fn get(&self, _key: &[u8]) -> StoreResult<Vec<KeyValue>> {
        Err(self.error())
    }

    async fn transact(&self, _txn: Txn) -> StoreResult<TxnResponse> {
        Err(self.error())
    }

    async fn create_user(&self, _credential: &Credential) -> StoreResult<()> {
        Err(self.error())
    }

    async fn delete_user(&self, _username: &str) -> StoreResult<()> {
        Err(self.error())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Err(self.error())
    }
}

/// A store that is reachable but refuses every request.
#[derive(Debug, Clone)]
pub struct RejectingStore {
    message: String,
}

impl RejectingStore {
    /// Creates a double that rejects every call with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
impl StoreClient for RejectingStore {
    async fn get(&self, _key: &[u8]) -> StoreResult<Vec<KeyValue>> {
        Err(StoreError::rejected(self.message.clone()))
    }

    async fn transact(&self, _txn: Txn) -> StoreResult<TxnResponse> {
        Err(StoreError::rejected(self.message.clone()))
    }

    async fn create_user(&self, _credential: &Credential) -> StoreResult<()> {
        Err(StoreError::rejected(self.message.clone()))
    }

    async fn delete_user(&self, _username: &str) -> StoreResult<()> {
        Err(StoreError::rejected(self.message.clone()))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Err(StoreError::rejected(self.message.clone()))
    }
}

/// A store whose calls never complete.
///
/// Calls are still counted so tests can tell that a request was in flight
/// when it got cancelled.
#[derive(Debug, Clone, Default)]
pub struct StalledStore {
    started: Arc<AtomicUsize>,
}

impl StalledStore {
    /// Creates a stalled store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that have started (and are still pending or were dropped).
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    async fn stall<T>(&self) -> StoreResult<T> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

#[async_trait]
impl StoreClient for StalledStore {
    async fn get(&self, _key: &[u8]) -> StoreResult<Vec<KeyValue>> {
        self.stall().await
    }

    async fn transact(&self, _txn: Txn) -> StoreResult<TxnResponse> {
        self.stall().await
    }

    async fn create_user(&self, _credential: &Credential) -> StoreResult<()> {
        self.stall().await
    }

    async fn delete_user(&self, _username: &str) -> StoreResult<()> {
        self.stall().await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.stall().await
    }
}

/// Assert that a [`StoreResult`] is a [`StoreError::Conflict`].
#[macro_export]
macro_rules! assert_conflict {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StoreError::Conflict)),
            "expected StoreError::Conflict, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StoreResult`] is a [`StoreError::NotFound`].
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StoreError::NotFound { .. })),
            "expected StoreError::NotFound, got: {:?}",
            $result,
        );
    };
}

/// Assert that a [`StoreResult`] is `Ok`, returning the inner value.
#[macro_export]
macro_rules! assert_store_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StoreError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StoreError: {e:?}", $msg),
        }
    };
}
