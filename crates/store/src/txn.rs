//! Conditional transactions.
//!
//! A [`Txn`] is an atomic condition→action request: the store evaluates every
//! [`Compare`] against its current state and, only if all of them hold,
//! applies every success [`TxnOp`]. Both steps happen at a single revision,
//! so no concurrent writer can slip in between the check and the write.
//!
//! This is the only concurrency primitive the reconcilers rely on; they never
//! take a lock of their own.
//!
//! # Example
//!
//! ```
//! use etcd_provider_store::{Compare, Txn, TxnOp};
//!
//! // Create "feature/x" only if nobody else has.
//! let txn = Txn::new()
//!     .when(Compare::key_missing("feature/x"))
//!     .and_then(TxnOp::put("feature/x", "enabled"));
//!
//! assert_eq!(txn.compares().len(), 1);
//! assert_eq!(txn.success().len(), 1);
//! ```

use bytes::Bytes;

/// A precondition on a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compare {
    /// Holds when the key is currently present.
    KeyExists(Bytes),
    /// Holds when the key is currently absent.
    KeyMissing(Bytes),
}

impl Compare {
    /// Precondition that `key` is present.
    pub fn key_exists(key: impl Into<Bytes>) -> Self {
        Self::KeyExists(key.into())
    }

    /// Precondition that `key` is absent.
    pub fn key_missing(key: impl Into<Bytes>) -> Self {
        Self::KeyMissing(key.into())
    }

    /// The key this precondition inspects.
    #[must_use]
    pub fn key(&self) -> &Bytes {
        match self {
            Self::KeyExists(key) | Self::KeyMissing(key) => key,
        }
    }

    /// Evaluates the precondition given whether the key is present.
    #[must_use]
    pub fn holds(&self, present: bool) -> bool {
        match self {
            Self::KeyExists(_) => present,
            Self::KeyMissing(_) => !present,
        }
    }
}

/// A write applied when a transaction's compares hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnOp {
    /// Sets `key` to `value`.
    Put {
        /// Key to write.
        key: Bytes,
        /// Value to store.
        value: Bytes,
    },
    /// Removes `key`.
    Delete {
        /// Key to remove.
        key: Bytes,
    },
}

impl TxnOp {
    /// Write operation.
    pub fn put(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::Put { key: key.into(), value: value.into() }
    }

    /// Delete operation.
    pub fn delete(key: impl Into<Bytes>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// The key this operation writes.
    #[must_use]
    pub fn key(&self) -> &Bytes {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// An atomic condition→action request.
///
/// An empty compare list always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "a transaction does nothing until passed to StoreClient::transact"]
pub struct Txn {
    compares: Vec<Compare>,
    success: Vec<TxnOp>,
}

impl Txn {
    /// Creates an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a precondition.
    pub fn when(mut self, compare: Compare) -> Self {
        self.compares.push(compare);
        self
    }

    /// Adds an operation to apply when all preconditions hold.
    pub fn and_then(mut self, op: TxnOp) -> Self {
        self.success.push(op);
        self
    }

    /// The preconditions, in insertion order.
    #[must_use]
    pub fn compares(&self) -> &[Compare] {
        &self.compares
    }

    /// The success operations, in insertion order.
    #[must_use]
    pub fn success(&self) -> &[TxnOp] {
        &self.success
    }

    /// Iterates over every key the transaction touches.
    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.compares.iter().map(Compare::key).chain(self.success.iter().map(TxnOp::key))
    }
}

/// Result of a committed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxnResponse {
    /// Whether every compare held and the success operations were applied.
    pub succeeded: bool,

    /// Store revision after the transaction was evaluated.
    pub revision: i64,
}
