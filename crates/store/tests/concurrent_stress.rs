//! Concurrent access stress tests for `MemoryStore`.
//!
//! These tests exercise conditional transactions under multi-threaded
//! contention to detect lost updates and torn writes. The heavier rounds are
//! ignored by default:
//!
//! ```bash
//! cargo test -p etcd-provider-store --test concurrent_stress -- --ignored
//! ```

#![allow(clippy::expect_used, clippy::panic)]

use std::collections::HashSet;

use bytes::Bytes;
use etcd_provider_store::{
    Compare, MemoryStore, StoreClient, Txn, TxnOp,
    testutil::{make_key, make_tagged_value},
};
use tokio::task::JoinSet;

/// Number of concurrent tasks for most tests.
const CONCURRENCY: usize = 16;

/// Number of create/delete rounds for the churn test.
const ROUNDS: usize = 50;

fn create(key: &[u8], value: Vec<u8>) -> Txn {
    let key = Bytes::copy_from_slice(key);
    Txn::new().when(Compare::KeyMissing(key.clone())).and_then(TxnOp::put(key, value))
}

fn delete(key: &[u8]) -> Txn {
    let key = Bytes::copy_from_slice(key);
    Txn::new().when(Compare::KeyExists(key.clone())).and_then(TxnOp::delete(key))
}

// ---------------------------------------------------------------------------
// Test: racing creates, exactly one winner per key
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_creates_exactly_one_winner() {
    let store = MemoryStore::new();
    let key = make_key("race", 0);

    let mut set = JoinSet::new();
    for task_id in 0..CONCURRENCY {
        let store = store.clone();
        let key = key.clone();
        set.spawn(async move {
            let response = store
                .transact(create(&key, make_tagged_value(task_id)))
                .await
                .expect("transact should succeed");
            (task_id, response.succeeded)
        });
    }

    let mut winners = Vec::new();
    while let Some(result) = set.join_next().await {
        let (task_id, succeeded) = result.expect("task should not panic");
        if succeeded {
            winners.push(task_id);
        }
    }

    assert_eq!(winners.len(), 1, "exactly one create should win, got {winners:?}");
    let kvs = store.get(&key).await.expect("get");
    assert_eq!(kvs[0].value.as_ref(), make_tagged_value(winners[0]).as_slice());
    assert_eq!(kvs[0].version, 1, "losers must not have written");
}

// ---------------------------------------------------------------------------
// Test: disjoint keys never interfere
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_creates_all_succeed() {
    let store = MemoryStore::new();

    let mut set = JoinSet::new();
    for task_id in 0..CONCURRENCY {
        let store = store.clone();
        set.spawn(async move {
            let key = make_key("disjoint", task_id);
            store.transact(create(&key, make_tagged_value(task_id))).await.expect("transact")
        });
    }

    let mut revisions = HashSet::new();
    while let Some(result) = set.join_next().await {
        let response = result.expect("task should not panic");
        assert!(response.succeeded);
        revisions.insert(response.revision);
    }

    assert_eq!(store.len(), CONCURRENCY);
    assert_eq!(revisions.len(), CONCURRENCY, "every write must get its own revision");
}

// ---------------------------------------------------------------------------
// Test: delete/recreate churn never loses a recreate
// ---------------------------------------------------------------------------

/// Each round, one task deletes the key while another recreates it.
/// Successful creates and deletes must strictly alternate, so the final
/// presence of the key equals creates minus deletes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn delete_recreate_churn_is_consistent() {
    let store = MemoryStore::new();
    let key = make_key("churn", 0);
    store.transact(create(&key, b"seed".to_vec())).await.expect("seed");

    let mut created = 1usize;
    let mut deleted = 0usize;
    for round in 0..ROUNDS {
        let deleter = {
            let store = store.clone();
            let key = key.clone();
            tokio::spawn(async move { store.transact(delete(&key)).await })
        };
        let creator = {
            let store = store.clone();
            let key = key.clone();
            tokio::spawn(async move { store.transact(create(&key, make_tagged_value(round))).await })
        };

        if deleter.await.expect("join").expect("delete").succeeded {
            deleted += 1;
        }
        if creator.await.expect("join").expect("create").succeeded {
            created += 1;
        }
    }

    let present = !store.get(&key).await.expect("get").is_empty();
    assert_eq!(
        usize::from(present),
        created - deleted,
        "creates ({created}) minus deletes ({deleted}) must match final presence"
    );
}
