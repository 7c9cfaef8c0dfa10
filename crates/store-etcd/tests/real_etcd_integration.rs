//! Integration tests against a real etcd cluster.
//!
//! These tests are skipped unless `RUN_ETCD_INTEGRATION_TESTS` is set. The
//! cluster is reached at `ETCD_ENDPOINT` (default `http://127.0.0.1:2379`)
//! and must have authentication disabled, or be configured through
//! `ETCD_USERNAME` / `ETCD_PASSWORD` with a user allowed to manage users.
//!
//! ```bash
//! docker run -d -p 2379:2379 quay.io/coreos/etcd:v3.5.17 \
//!     etcd --listen-client-urls http://0.0.0.0:2379 --advertise-client-urls http://0.0.0.0:2379
//! RUN_ETCD_INTEGRATION_TESTS=1 cargo test -p etcd-provider-store-etcd --test real_etcd_integration
//! ```

#![allow(clippy::expect_used, clippy::panic)]

use std::{
    env,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use etcd_provider_store::{StoreClient, StoreError, conformance};
use etcd_provider_store_etcd::{EtcdStore, EtcdStoreConfig};

fn should_run() -> bool {
    env::var("RUN_ETCD_INTEGRATION_TESTS").is_ok()
}

fn endpoint() -> String {
    env::var("ETCD_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:2379".to_owned())
}

/// Prefix unique to this run so repeated runs against one cluster don't collide.
fn unique_prefix(test: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    format!("it-{test}-{nanos}")
}

async fn connect() -> EtcdStore {
    let config = match (env::var("ETCD_USERNAME"), env::var("ETCD_PASSWORD")) {
        (Ok(username), Ok(password)) => EtcdStoreConfig::builder()
            .endpoints([endpoint()])
            .username(username)
            .password(password)
            .build(),
        _ => EtcdStoreConfig::builder().endpoints([endpoint()]).build(),
    }
    .expect("valid config");

    EtcdStore::connect(&config).await.expect("connect to etcd")
}

macro_rules! skip_unless_enabled {
    () => {
        if !should_run() {
            eprintln!("skipping: RUN_ETCD_INTEGRATION_TESTS not set");
            return;
        }
    };
}

#[tokio::test]
async fn test_conformance_reads_and_transactions() {
    skip_unless_enabled!();
    let store = connect().await;

    conformance::health_check_succeeds(&store).await;
    conformance::get_missing_key_is_empty(&store, &unique_prefix("get")).await;
    conformance::get_empty_key_is_invalid(&store).await;
    conformance::txn_create_if_missing(&store, &unique_prefix("create")).await;
    conformance::txn_create_on_existing_fails(&store, &unique_prefix("exists")).await;
    conformance::txn_delete_if_exists(&store, &unique_prefix("delete")).await;
    conformance::txn_revisions_advance(&store, &unique_prefix("rev")).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_conformance_concurrent_creates() {
    skip_unless_enabled!();
    let store = Arc::new(connect().await);
    conformance::txn_concurrent_creates_single_winner(store, &unique_prefix("race"), 8).await;
}

#[tokio::test]
async fn test_conformance_user_lifecycle() {
    skip_unless_enabled!();
    let store = connect().await;
    conformance::user_lifecycle(&store, &unique_prefix("user")).await;
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_error() {
    skip_unless_enabled!();

    // Nothing listens on port 1
    let config = EtcdStoreConfig::builder()
        .endpoints(["http://127.0.0.1:1"])
        .dial_timeout(Duration::from_millis(500))
        .request_timeout(Duration::from_secs(1))
        .build()
        .expect("valid config");

    let result = match EtcdStore::connect(&config).await {
        Err(err) => Err(StoreError::from(err)),
        Ok(store) => store.get(b"probe").await.map(|_| ()),
    };

    assert!(
        matches!(result, Err(StoreError::Connection { .. } | StoreError::Timeout)),
        "expected connection failure, got {result:?}"
    );
}
