//! Single-flight creation under contention, failure sharing and
//! cancellation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{StubConfig, stub_connection, stub_group};
use dbhive_registry::Context;
use tokio::task::JoinSet;

// ---------------------------------------------------------------------------
// Exactly-once creation
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn fifty_concurrent_gets_open_once() {
    let (group, counters) = stub_group();
    group
        .register("x", StubConfig::slow(Duration::from_millis(50)))
        .unwrap();

    let mut set = JoinSet::new();
    for _ in 0..50 {
        let group = Arc::clone(&group);
        set.spawn(async move { group.get(&Context::new(), "x").await });
    }

    let mut handles = Vec::new();
    while let Some(joined) = set.join_next().await {
        handles.push(joined.expect("task panicked").expect("get failed"));
    }

    assert_eq!(counters.opens(), 1);
    assert_eq!(handles.len(), 50);
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
}

#[tokio::test(start_paused = true)]
async fn waiters_share_a_failed_attempt() {
    let (group, counters) = stub_group();
    let config = StubConfig {
        open_delay: Duration::from_millis(100),
        fail_opens: 1,
        ..StubConfig::default()
    };
    group.register("x", config).unwrap();

    let mut set = JoinSet::new();
    for _ in 0..10 {
        let group = Arc::clone(&group);
        set.spawn(async move { group.get(&Context::new(), "x").await });
    }

    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        failures.push(joined.expect("task panicked").unwrap_err());
    }

    assert_eq!(counters.opens(), 1);
    assert!(failures.iter().all(|err| err.is_creation_failed()));
    let first = failures[0].cause().map(ToString::to_string);
    assert!(
        failures
            .iter()
            .all(|err| err.cause().map(ToString::to_string) == first)
    );

    // A caller arriving after the failure retries.
    assert!(group.get(&Context::new(), "x").await.is_ok());
    assert_eq!(counters.opens(), 2);
}

#[tokio::test(start_paused = true)]
async fn different_names_do_not_block_each_other() {
    let (group, _) = stub_group();
    group
        .register("slow", StubConfig::slow(Duration::from_secs(3600)))
        .unwrap();
    group.register("fast", StubConfig::default()).unwrap();

    let slow = {
        let group = Arc::clone(&group);
        tokio::spawn(async move { group.get(&Context::new(), "slow").await })
    };
    tokio::task::yield_now().await;

    group.get(&Context::new(), "fast").await.unwrap();
    assert!(group.is_created("fast"));
    assert!(!slow.is_finished());
    slow.abort();
}

// ---------------------------------------------------------------------------
// Unregister racing creation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn unregister_during_creation_retires_the_entry() {
    let (group, counters) = stub_group();
    group
        .register("x", StubConfig::slow(Duration::from_millis(100)))
        .unwrap();

    let creating = tokio::spawn({
        let group = Arc::clone(&group);
        async move { group.get(&Context::new(), "x").await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(counters.opens(), 1);

    let unregistering = tokio::spawn({
        let group = Arc::clone(&group);
        async move { group.unregister(&Context::new(), "x").await }
    });
    tokio::time::sleep(Duration::from_millis(1)).await;

    // Looked up while the entry is still mapped, so it holds a stale handle
    // and queues on the creation gate behind the unregister.
    let stale = tokio::spawn({
        let group = Arc::clone(&group);
        async move { group.get(&Context::new(), "x").await }
    });

    assert!(creating.await.unwrap().is_ok());
    unregistering.await.unwrap().unwrap();
    assert!(stale.await.unwrap().unwrap_err().is_not_registered());

    assert_eq!(counters.closes(), 1);
    assert!(!group.contains("x"));
    assert!(group.get(&Context::new(), "x").await.unwrap_err().is_not_registered());
    assert_eq!(counters.opens(), 1);
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn expired_context_fails_creation_and_leaves_entry_absent() {
    let (group, counters) = stub_group();
    group
        .register("x", StubConfig::slow(Duration::from_secs(10)))
        .unwrap();

    let ctx = Context::new().with_timeout(Duration::from_millis(20));
    let err = group.get(&ctx, "x").await.unwrap_err();

    assert!(err.is_creation_failed());
    assert_eq!(
        err.cause().map(ToString::to_string).as_deref(),
        Some("deadline exceeded")
    );
    assert!(!group.is_created("x"));

    // Next call with a fresh context retries from scratch.
    group.get(&Context::new(), "x").await.unwrap();
    assert_eq!(counters.opens(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropped_caller_leaves_entry_retryable() {
    let (group, counters) = stub_group();
    group
        .register("x", StubConfig::slow(Duration::from_secs(10)))
        .unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(5), group.get(&Context::new(), "x")).await;
    assert!(abandoned.is_err());
    assert!(!group.is_created("x"));

    group.get(&Context::new(), "x").await.unwrap();
    assert_eq!(counters.opens(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_context_reaches_opener() {
    let (group, _) = stub_group();
    group
        .register("x", StubConfig::slow(Duration::from_secs(10)))
        .unwrap();
    let ctx = Context::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = group.get(&ctx, "x").await.unwrap_err();
    assert_eq!(
        err.cause().map(ToString::to_string).as_deref(),
        Some("operation cancelled")
    );
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn connection_connects_once_under_contention() {
    let (conn, counters) = stub_connection(StubConfig::slow(Duration::from_millis(50)));

    let mut set = JoinSet::new();
    for _ in 0..20 {
        let conn = Arc::clone(&conn);
        set.spawn(async move { conn.connect(&Context::new()).await });
    }
    while let Some(joined) = set.join_next().await {
        joined.expect("task panicked").expect("connect failed");
    }

    assert_eq!(counters.opens(), 1);
    assert!(conn.is_connected());

    conn.disconnect(&Context::new()).await.unwrap();
    conn.disconnect(&Context::new()).await.unwrap();
    assert_eq!(counters.closes(), 1);
}
