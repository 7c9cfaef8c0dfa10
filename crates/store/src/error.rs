//! Store error types and result alias.
//!
//! Every [`StoreClient`](crate::StoreClient) implementation maps its
//! transport- or server-specific failures onto [`StoreError`]. The variants
//! are chosen so that callers can tell apart four situations that need
//! different operator action:
//!
//! - the request itself was malformed ([`StoreError::InvalidArgument`])
//! - a precondition on existing data failed ([`StoreError::Conflict`],
//!   [`StoreError::NotFound`])
//! - the cluster could not be reached at all ([`StoreError::Connection`])
//! - the cluster was reached but refused the request ([`StoreError::Rejected`])
//!
//! # Example
//!
//! ```
//! use etcd_provider_store::{StoreError, StoreResult};
//!
//! fn lookup_user(name: &str) -> StoreResult<()> {
//!     Err(StoreError::not_found(name))
//! }
//!
//! assert!(matches!(lookup_user("alice"), Err(StoreError::NotFound { .. })));
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the store.
///
/// Errors preserve their source chain via the `#[source]` attribute, so
/// diagnostics can show the underlying transport failure.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The addressed entity does not exist.
    ///
    /// Returned by user deletion when no such user is registered.
    #[error("Not found: {key}")]
    NotFound {
        /// The key or name that was not found.
        key: String,
    },

    /// The entity already exists or a precondition on it failed.
    ///
    /// Returned by user creation for a duplicate name. Transactions whose
    /// compares fail do not return this error; they report
    /// `succeeded == false` in their [`TxnResponse`](crate::TxnResponse).
    #[error("Conflict")]
    Conflict,

    /// The request was rejected client-side or by the server as malformed,
    /// e.g. an empty key.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The cluster endpoints could not be used.
    ///
    /// Covers refused connections, DNS failures, unparseable endpoint URLs
    /// and endpoints that do not speak the store protocol.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// The cluster was reached but refused to serve the request.
    ///
    /// Covers authentication and permission failures, lost quorum and other
    /// server-side errors that are not about the request's arguments.
    #[error("Request rejected by store: {message}")]
    Rejected {
        /// Description of the rejection.
        message: String,
        /// The underlying error that caused the rejection.
        #[source]
        source: Option<BoxError>,
    },

    /// The store call exceeded its time limit.
    #[error("Operation timeout")]
    Timeout,

    /// The store call was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Creates a new `NotFound` error for the given key or name.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict() -> Self {
        Self::Conflict
    }

    /// Creates a new `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Rejected` error with the given message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into(), source: None }
    }

    /// Creates a new `Rejected` error with a message and source error.
    #[must_use]
    pub fn rejected_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Rejected { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Cancelled` error.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::Cancelled
    }
}
