//! In-memory store implementation.
//!
//! [`MemoryStore`] is a linearizable, single-process stand-in for an etcd
//! cluster. It is what the reconcilers are tested against and is handy for
//! local development.
//!
//! # Features
//!
//! - **Linearizable**: every operation runs under one [`parking_lot::RwLock`],
//!   so a transaction's compares and writes observe a single revision
//! - **etcd-like revisions**: a global revision counter plus per-key
//!   `create_revision`, `mod_revision` and `version`
//! - **Users**: a separate user namespace with duplicate detection
//! - **Fail points**: `memory-get`, `memory-transact`, `memory-create-user` and
//!   `memory-delete-user` return a connection error when configured (requires
//!   the `failpoints` feature)
//!
//! # Example
//!
//! ```
//! use etcd_provider_store::{Credential, MemoryStore, StoreClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     store.create_user(&Credential::new("app", "long-enough-pw")).await.unwrap();
//!     assert!(store.has_user("app"));
//! }
//! ```

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use fail::fail_point;
use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::{
    client::StoreClient,
    error::{StoreError, StoreResult},
    txn::{Txn, TxnOp, TxnResponse},
    types::{Credential, KeyValue},
};

/// Error message etcd returns for an empty key.
const EMPTY_KEY_MESSAGE: &str = "key is not provided";

/// Error message etcd returns for an empty user name.
const EMPTY_USER_MESSAGE: &str = "user name is empty";

#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    create_revision: i64,
    mod_revision: i64,
    version: i64,
}

#[derive(Default)]
struct State {
    revision: i64,
    data: BTreeMap<Vec<u8>, Entry>,
    users: BTreeMap<String, Zeroizing<String>>,
}

impl State {
    fn apply(&mut self, op: &TxnOp, revision: i64) {
        match op {
            TxnOp::Put { key, value } => {
                let (create_revision, version) = match self.data.get(key.as_ref()) {
                    Some(existing) => (existing.create_revision, existing.version + 1),
                    None => (revision, 1),
                };
                self.data.insert(
                    key.to_vec(),
                    Entry { value: value.clone(), create_revision, mod_revision: revision, version },
                );
            },
            TxnOp::Delete { key } => {
                self.data.remove(key.as_ref());
            },
        }
    }
}

/// In-memory store.
///
/// # Cloning
///
/// `MemoryStore` is cheaply cloneable via [`Arc`]. All clones share the same
/// underlying keyspace and user table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Creates an empty store at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current store revision.
    #[must_use]
    pub fn revision(&self) -> i64 {
        self.state.read().revision
    }

    /// Returns the number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().data.len()
    }

    /// Returns `true` if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().data.is_empty()
    }

    /// Returns `true` if a user with this name is registered.
    #[must_use]
    pub fn has_user(&self, username: &str) -> bool {
        self.state.read().users.contains_key(username)
    }

    /// Returns `true` if the user exists and its password equals `password`.
    #[must_use]
    pub fn verify_user(&self, username: &str, password: &str) -> bool {
        self.state.read().users.get(username).is_some_and(|stored| stored.as_str() == password)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryStore")
            .field("revision", &state.revision)
            .field("keys", &state.data.len())
            .field("users", &state.users.len())
            .finish()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    #[tracing::instrument(skip(self, key), fields(key_len = key.len()))]
    async fn get(&self, key: &[u8]) -> StoreResult<Vec<KeyValue>> {
        fail_point!("memory-get", |_| Err(StoreError::connection("fail point: memory-get")));

        if key.is_empty() {
            return Err(StoreError::invalid_argument(EMPTY_KEY_MESSAGE));
        }

        let state = self.state.read();
        Ok(state
            .data
            .get(key)
            .map(|entry| KeyValue {
                key: Bytes::copy_from_slice(key),
                value: entry.value.clone(),
                create_revision: entry.create_revision,
                mod_revision: entry.mod_revision,
                version: entry.version,
            })
            .into_iter()
            .collect())
    }

    #[tracing::instrument(
        skip(self, txn),
        fields(compares = txn.compares().len(), ops = txn.success().len())
    )]
    async fn transact(&self, txn: Txn) -> StoreResult<TxnResponse> {
        fail_point!("memory-transact", |_| {
            Err(StoreError::connection("fail point: memory-transact"))
        });

        if txn.keys().any(Bytes::is_empty) {
            return Err(StoreError::invalid_argument(EMPTY_KEY_MESSAGE));
        }

        let mut state = self.state.write();

        let succeeded = txn
            .compares()
            .iter()
            .all(|compare| compare.holds(state.data.contains_key(compare.key().as_ref())));

        if succeeded && !txn.success().is_empty() {
            state.revision += 1;
            let revision = state.revision;
            for op in txn.success() {
                state.apply(op, revision);
            }
        }

        tracing::trace!(succeeded, revision = state.revision, "transaction evaluated");
        Ok(TxnResponse { succeeded, revision: state.revision })
    }

    #[tracing::instrument(skip(self, credential), fields(username = credential.username()))]
    async fn create_user(&self, credential: &Credential) -> StoreResult<()> {
        fail_point!("memory-create-user", |_| {
            Err(StoreError::connection("fail point: memory-create-user"))
        });

        if credential.username().is_empty() {
            return Err(StoreError::invalid_argument(EMPTY_USER_MESSAGE));
        }

        let mut state = self.state.write();
        if state.users.contains_key(credential.username()) {
            return Err(StoreError::Conflict);
        }
        state
            .users
            .insert(credential.username().to_owned(), Zeroizing::new(credential.password().to_owned()));
        state.revision += 1;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_user(&self, username: &str) -> StoreResult<()> {
        fail_point!("memory-delete-user", |_| {
            Err(StoreError::connection("fail point: memory-delete-user"))
        });

        if username.is_empty() {
            return Err(StoreError::invalid_argument(EMPTY_USER_MESSAGE));
        }

        let mut state = self.state.write();
        if state.users.remove(username).is_none() {
            return Err(StoreError::not_found(username));
        }
        state.revision += 1;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn health_check(&self) -> StoreResult<()> {
        // Acquiring the read lock proves we're not deadlocked
        let _unused = self.state.read();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::txn::Compare;

    fn create(key: &'static str, value: &'static str) -> Txn {
        Txn::new().when(Compare::key_missing(key)).and_then(TxnOp::put(key, value))
    }

    #[tokio::test]
    async fn test_get_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(store.get(b"missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let response = store.transact(create("k", "v")).await.unwrap();
        assert!(response.succeeded);
        assert_eq!(response.revision, 1);

        let kvs = store.get(b"k").await.unwrap();
        assert_eq!(kvs.len(), 1);
        assert_eq!(kvs[0].value, Bytes::from("v"));
        assert_eq!(kvs[0].create_revision, 1);
        assert_eq!(kvs[0].mod_revision, 1);
        assert_eq!(kvs[0].version, 1);
    }

    #[tokio::test]
    async fn test_failed_compare_writes_nothing() {
        let store = MemoryStore::new();
        store.transact(create("k", "first")).await.unwrap();

        let response = store.transact(create("k", "second")).await.unwrap();
        assert!(!response.succeeded);
        assert_eq!(response.revision, 1, "a failed compare must not bump the revision");

        let kvs = store.get(b"k").await.unwrap();
        assert_eq!(kvs[0].value, Bytes::from("first"));
    }

    #[tokio::test]
    async fn test_unconditional_put_bumps_version() {
        let store = MemoryStore::new();
        store.transact(Txn::new().and_then(TxnOp::put("k", "1"))).await.unwrap();
        store.transact(Txn::new().and_then(TxnOp::put("k", "2"))).await.unwrap();

        let kv = &store.get(b"k").await.unwrap()[0];
        assert_eq!(kv.version, 2);
        assert_eq!(kv.create_revision, 1);
        assert_eq!(kv.mod_revision, 2);
    }

    #[tokio::test]
    async fn test_conditional_delete() {
        let store = MemoryStore::new();
        store.transact(create("k", "v")).await.unwrap();

        let delete = || Txn::new().when(Compare::key_exists("k")).and_then(TxnOp::delete("k"));
        assert!(store.transact(delete()).await.unwrap().succeeded);
        assert!(!store.transact(delete()).await.unwrap().succeeded);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_key_is_invalid() {
        let store = MemoryStore::new();
        assert!(matches!(store.get(b"").await, Err(StoreError::InvalidArgument { .. })));

        let txn = Txn::new().when(Compare::key_missing("")).and_then(TxnOp::put("", "v"));
        assert!(matches!(store.transact(txn).await, Err(StoreError::InvalidArgument { .. })));
        assert_eq!(store.revision(), 0);
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let store = MemoryStore::new();
        let credential = Credential::new("app", "long-enough-pw");

        store.create_user(&credential).await.unwrap();
        assert!(store.verify_user("app", "long-enough-pw"));
        assert!(!store.verify_user("app", "wrong"));

        assert!(matches!(store.create_user(&credential).await, Err(StoreError::Conflict)));

        store.delete_user("app").await.unwrap();
        assert!(!store.has_user("app"));
        assert!(matches!(store.delete_user("app").await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_empty_username_is_invalid() {
        let store = MemoryStore::new();
        let result = store.create_user(&Credential::new("", "long-enough-pw")).await;
        assert!(matches!(result, Err(StoreError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.transact(create("shared", "v")).await.unwrap();
        assert_eq!(clone.len(), 1);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(MemoryStore::new().health_check().await.is_ok());
    }
}
