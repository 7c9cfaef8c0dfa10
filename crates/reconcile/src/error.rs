//! Reconciliation error taxonomy.
//!
//! [`ReconcileError`] is what the orchestration tool ultimately sees. Its
//! variants keep apart the situations that need different reactions:
//!
//! | Variant | Meaning |
//! |---------|---------|
//! | [`ClientCancelled`](ReconcileError::ClientCancelled) | the caller gave up |
//! | [`DeadlineExceeded`](ReconcileError::DeadlineExceeded) | the caller's deadline passed |
//! | [`InvalidInput`](ReconcileError::InvalidInput) | a declared attribute is unusable |
//! | [`TransactionConflict`](ReconcileError::TransactionConflict) | the existence precondition failed |
//! | [`ClusterUnreachable`](ReconcileError::ClusterUnreachable) | the cluster could not serve the call |
//! | [`NotFound`](ReconcileError::NotFound) | the addressed resource does not exist |

use std::{fmt, sync::Arc};

use etcd_provider_store::{BoxError, StoreError};
use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Lifecycle verb an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Resource creation.
    Create,
    /// Resource refresh.
    Read,
    /// Resource deletion.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Delete => "delete",
        })
    }
}

/// Kind of managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A single key/value entry.
    KeyValue,
    /// A store-native user account.
    User,
}

impl ResourceKind {
    /// Every resource kind, in registration order.
    pub const ALL: [ResourceKind; 2] = [ResourceKind::KeyValue, ResourceKind::User];

    /// The resource type name the orchestration tool addresses this kind by.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::KeyValue => "etcd_key_value",
            Self::User => "etcd_user",
        }
    }

    /// Looks up a kind by its resource type name.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    /// The declared attribute that identifies a resource of this kind.
    #[must_use]
    pub fn identity_attribute(self) -> &'static str {
        match self {
            Self::KeyValue => "key",
            Self::User => "username",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KeyValue => "key-value",
            Self::User => "user",
        })
    }
}

/// Where a cluster failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureOrigin {
    /// The endpoints could not be used (refused, unresolvable, not etcd).
    Endpoint,
    /// The cluster answered but refused to serve the request.
    Store,
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Endpoint => "bad cluster endpoints",
            Self::Store => "store rejected the request",
        })
    }
}

/// Errors returned by the reconcilers.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// The caller cancelled the operation.
    #[error("{operation} cancelled by client")]
    ClientCancelled {
        /// The interrupted operation.
        operation: Operation,
    },

    /// The caller's deadline passed before the operation finished.
    #[error("{operation} exceeded its deadline")]
    DeadlineExceeded {
        /// The interrupted operation.
        operation: Operation,
    },

    /// A declared attribute is malformed or violates policy.
    ///
    /// Raised before any network call whenever the problem is detectable
    /// locally.
    #[error("Invalid {field}: {message}")]
    InvalidInput {
        /// Name of the offending attribute.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// The existence precondition of a create did not hold.
    #[error("{kind} {id:?} already exists")]
    TransactionConflict {
        /// Kind of the contested resource.
        kind: ResourceKind,
        /// Identity of the contested resource.
        id: String,
    },

    /// The cluster could not serve the request.
    #[error("Cluster unreachable ({origin}): {message}")]
    ClusterUnreachable {
        /// Whether the endpoints or the store itself failed.
        origin: FailureOrigin,
        /// Description of the failure.
        message: String,
        /// The underlying store error.
        #[source]
        source: Option<BoxError>,
    },

    /// The addressed resource does not exist.
    #[error("{kind} {id:?} not found")]
    NotFound {
        /// Kind of the missing resource.
        kind: ResourceKind,
        /// Identity of the missing resource.
        id: String,
    },
}

impl ReconcileError {
    /// Creates an `InvalidInput` error for `field`.
    #[must_use]
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput { field: field.into(), message: message.into() }
    }

    /// Returns the failure origin if this is a cluster failure.
    #[must_use]
    pub fn origin(&self) -> Option<FailureOrigin> {
        match self {
            Self::ClusterUnreachable { origin, .. } => Some(*origin),
            _ => None,
        }
    }

    /// Returns the attribute this error is about, if any.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns `true` if the caller interrupted the operation.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::ClientCancelled { .. } | Self::DeadlineExceeded { .. })
    }

    /// Logs a failed `action`. Interruptions are the caller's doing and only
    /// logged at debug level.
    pub(crate) fn log_failure(&self, action: &str) {
        if self.is_interrupted() {
            tracing::debug!(error = %self, "{action} interrupted");
        } else {
            tracing::warn!(error = %self, "{action} failed");
        }
    }

    /// Classifies a store failure that happened while running `operation` on
    /// the `kind` resource identified by `id`.
    pub(crate) fn from_store(
        err: StoreError,
        operation: Operation,
        kind: ResourceKind,
        id: &str,
    ) -> Self {
        match err {
            StoreError::InvalidArgument { message } => {
                Self::invalid_input(kind.identity_attribute(), message)
            },
            StoreError::Conflict => Self::TransactionConflict { kind, id: id.to_owned() },
            StoreError::NotFound { .. } => Self::NotFound { kind, id: id.to_owned() },
            StoreError::Timeout => Self::DeadlineExceeded { operation },
            StoreError::Cancelled => Self::ClientCancelled { operation },
            err @ StoreError::Connection { .. } => Self::ClusterUnreachable {
                origin: FailureOrigin::Endpoint,
                message: format!("{operation} {kind} {id:?}: {err}"),
                source: Some(Arc::new(err)),
            },
            other => Self::ClusterUnreachable {
                origin: FailureOrigin::Store,
                message: format!("{operation} {kind} {id:?}: {other}"),
                source: Some(Arc::new(other)),
            },
        }
    }
}
