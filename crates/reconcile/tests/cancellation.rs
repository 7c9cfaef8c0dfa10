//! Cancellation and deadline behaviour of every verb.
//!
//! A context that is already done must fail before any store call. A context
//! that fires while the call is pending must drop it. `StalledStore` never
//! answers, so only the context can end those calls; the paused clock makes
//! deadlines fire instantly.

#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use etcd_provider_reconcile::{
    CancellationToken, KeyValueConfig, KeyValueReconciler, Operation, OperationContext,
    ReconcileError, UserConfig, UserReconciler,
};
use etcd_provider_store::{
    MemoryStore, StoreClient,
    testutil::{RecordingStore, StalledStore},
};

#[tokio::test]
async fn precancelled_create_leaves_key_absent() {
    let store = Arc::new(RecordingStore::new());
    let reconciler = KeyValueReconciler::new(Arc::clone(&store));
    let ctx = OperationContext::new();
    ctx.cancel();

    let result = reconciler.create(&ctx, &KeyValueConfig::new("k", "v")).await;

    assert!(
        matches!(result, Err(ReconcileError::ClientCancelled { operation: Operation::Create })),
        "got {result:?}"
    );
    assert_eq!(store.calls().total(), 0, "no store call may be issued");
    assert!(store.inner().get(b"k").await.expect("get").is_empty());
}

#[tokio::test]
async fn precancelled_read_and_delete() {
    let store = Arc::new(MemoryStore::new());
    let reconciler = KeyValueReconciler::new(Arc::clone(&store));
    reconciler
        .create(&OperationContext::new(), &KeyValueConfig::new("k", "v"))
        .await
        .expect("create");

    let ctx = OperationContext::new();
    ctx.cancel();

    assert!(matches!(
        reconciler.read(&ctx, b"k").await,
        Err(ReconcileError::ClientCancelled { operation: Operation::Read })
    ));
    assert!(matches!(
        reconciler.delete(&ctx, b"k").await,
        Err(ReconcileError::ClientCancelled { operation: Operation::Delete })
    ));
    assert_eq!(store.len(), 1, "cancelled delete must not remove the key");
}

#[tokio::test(start_paused = true)]
async fn expired_deadline_fails_before_store_call() {
    let store = Arc::new(RecordingStore::new());
    let users = UserReconciler::new(Arc::clone(&store));
    let ctx = OperationContext::new().with_timeout(Duration::from_millis(10));
    tokio::time::advance(Duration::from_millis(20)).await;

    let result = users.create(&ctx, &UserConfig::new("app", "0123456789")).await;

    assert!(matches!(
        result,
        Err(ReconcileError::DeadlineExceeded { operation: Operation::Create })
    ));
    assert_eq!(store.calls().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn deadline_interrupts_stalled_create() {
    let store = Arc::new(StalledStore::new());
    let reconciler = KeyValueReconciler::new(Arc::clone(&store));
    let ctx = OperationContext::new().with_timeout(Duration::from_secs(5));

    let result = reconciler.create(&ctx, &KeyValueConfig::new("k", "v")).await;

    assert!(matches!(
        result,
        Err(ReconcileError::DeadlineExceeded { operation: Operation::Create })
    ));
    assert_eq!(store.started(), 1, "the call must have been in flight");
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_stalled_delete() {
    let store = Arc::new(StalledStore::new());
    let users = UserReconciler::new(Arc::clone(&store));
    let token = CancellationToken::new();
    let ctx = OperationContext::new().with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let result = users.delete(&ctx, "app").await;

    assert!(matches!(
        result,
        Err(ReconcileError::ClientCancelled { operation: Operation::Delete })
    ));
    assert_eq!(store.started(), 1);
    canceller.await.expect("canceller task");
}

#[tokio::test(start_paused = true)]
async fn stalled_read_without_deadline_is_cancellable() {
    let store = Arc::new(StalledStore::new());
    let reconciler = KeyValueReconciler::new(store);
    let ctx = OperationContext::new();

    let read = {
        let ctx = ctx.clone();
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.read(&ctx, b"k").await })
    };

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert!(!read.is_finished(), "nothing but the context may end a stalled call");

    ctx.cancel();
    let result = read.await.expect("read task");
    assert!(matches!(result, Err(ReconcileError::ClientCancelled { operation: Operation::Read })));
}
