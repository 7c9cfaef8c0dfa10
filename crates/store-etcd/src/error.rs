//! Error types for the etcd store.
//!
//! This module maps `etcd-client` and gRPC failures onto the generic
//! [`StoreError`](etcd_provider_store::StoreError) variants. The important
//! split is between endpoints that cannot be used at all
//! ([`StoreError::Connection`]) and a cluster that answered but refused the
//! request ([`StoreError::Rejected`]).

use etcd_provider_store::StoreError;
use thiserror::Error;
use tonic::Code;

/// Result type alias for etcd store operations.
pub type Result<T> = std::result::Result<T, EtcdStoreError>;

/// Errors specific to the etcd store.
#[derive(Debug, Error)]
pub enum EtcdStoreError {
    /// Error from the etcd client.
    #[error("etcd client error: {0}")]
    Client(#[from] etcd_client::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<EtcdStoreError> for StoreError {
    fn from(err: EtcdStoreError) -> Self {
        match err {
            EtcdStoreError::Client(source) => client_error_to_store_error(source),
            EtcdStoreError::Config(message) => {
                StoreError::invalid_argument(format!("Config: {message}"))
            },
        }
    }
}

/// Converts an `etcd-client` error to a store error.
fn client_error_to_store_error(err: etcd_client::Error) -> StoreError {
    match err {
        etcd_client::Error::GRpcStatus(status) => status_to_store_error(status),

        // The endpoint could not be dialled or did not speak gRPC
        etcd_client::Error::TransportError(source) => {
            StoreError::connection_with_source("bad cluster endpoints", source)
        },
        etcd_client::Error::InvalidUri(source) => {
            StoreError::connection_with_source("invalid cluster endpoint URI", source)
        },
        etcd_client::Error::IoError(source) => {
            StoreError::connection_with_source("I/O error talking to cluster", source)
        },

        etcd_client::Error::InvalidArgs(message) => StoreError::invalid_argument(message),

        other => StoreError::rejected(other.to_string()),
    }
}

/// Message prefix carried by every error an etcd server reports.
const ETCD_SERVER_PREFIX: &str = "etcdserver:";

/// Message tonic attaches to the `Cancelled` status it synthesises when the
/// per-request timeout set through `ConnectOptions::with_timeout` expires.
const REQUEST_TIMEOUT_MESSAGE: &str = "Timeout expired";

/// Maps a gRPC status returned by an etcd server.
///
/// etcd reports several distinct conditions under `FailedPrecondition`, so the
/// message text decides between conflict, not-found and a plain rejection.
/// Statuses that did not come from etcd at all mean the endpoint is not an
/// etcd server and are reported as connection failures.
fn status_to_store_error(status: tonic::Status) -> StoreError {
    let message = status.message().to_owned();
    match status.code() {
        Code::InvalidArgument | Code::OutOfRange => StoreError::invalid_argument(message),
        Code::AlreadyExists => StoreError::conflict(),
        Code::NotFound => StoreError::not_found(message),
        Code::FailedPrecondition if message.contains("already exists") => StoreError::conflict(),
        Code::FailedPrecondition if message.contains("not found") => {
            StoreError::not_found(message)
        },
        Code::Unavailable => StoreError::connection_with_source(message, status),
        Code::DeadlineExceeded => {
            tracing::warn!(%message, "etcd request deadline exceeded");
            StoreError::timeout()
        },
        Code::Cancelled if message == REQUEST_TIMEOUT_MESSAGE => {
            tracing::warn!("etcd request timeout expired");
            StoreError::timeout()
        },
        Code::Cancelled => StoreError::cancelled(),
        Code::PermissionDenied | Code::Unauthenticated => {
            StoreError::rejected_with_source(format!("Auth error: {message}"), status)
        },
        code if message.starts_with(ETCD_SERVER_PREFIX) => {
            StoreError::rejected_with_source(format!("gRPC error ({code:?}): {message}"), status)
        },
        code => StoreError::connection_with_source(
            format!("bad cluster endpoints, which are not etcd servers ({code:?}): {message}"),
            status,
        ),
    }
}
