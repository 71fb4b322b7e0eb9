//! Pool registry lifecycle and scoped-borrow tests.

use super::common::*;
use futures::future::join_all;
use sqlmagic_adapter_pg::PoolError;
use std::time::Duration;

pub async fn test_connect_then_listed(ctx: &TestContext) {
    println!("  🧪 test_connect_then_listed");

    let registry = ctx.registry(4);
    registry
        .connect(connect_params("main"))
        .await
        .expect("connect should succeed");

    assert!(registry.is_connected("main").await);
    let listed = registry.list_connections().await;
    let info = listed.get("main").expect("main should be listed");
    assert_eq!(info.database, DATABASE_NAME);
    assert_eq!(info.port, POSTGRES_PORT);
    assert_eq!(info.max_size, 4);
    assert_eq!(registry.metrics().snapshot().connections_created, 1);

    registry.shutdown().await;
    println!("     ✓ Connected pool is live and listed");
}

pub async fn test_disconnect_twice(ctx: &TestContext) {
    println!("  🧪 test_disconnect_twice");

    let registry = ctx.registry(2);
    registry.connect(connect_params("temp")).await.unwrap();

    assert!(registry.disconnect("temp").await);
    assert!(!registry.is_connected("temp").await);
    assert!(!registry.list_connections().await.contains_key("temp"));
    assert!(!registry.disconnect("temp").await);

    println!("     ✓ Disconnect removes the entry and is idempotent");
}

pub async fn test_reconnect_replaces_pool(ctx: &TestContext) {
    println!("  🧪 test_reconnect_replaces_pool");

    let registry = ctx.registry(2);
    registry.connect(connect_params("same")).await.unwrap();
    registry
        .connect(connect_params("same").with_max_size(3))
        .await
        .unwrap();

    let listed = registry.list_connections().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed["same"].max_size, 3);
    assert!(registry.is_connected("same").await);

    registry.shutdown().await;
    assert!(registry.list_connections().await.is_empty());
    println!("     ✓ Reconnecting under a name swaps in the new pool");
}

pub async fn test_borrow_unknown_fails_fast(ctx: &TestContext) {
    println!("  🧪 test_borrow_unknown_fails_fast");

    let registry = ctx.registry(2);
    let started = std::time::Instant::now();
    let err = registry.borrow("nobody").await.unwrap_err();

    assert!(matches!(err, PoolError::ConnectionNotFound(ref n) if n == "nobody"));
    assert!(started.elapsed() < Duration::from_secs(1));
    println!("     ✓ Unknown name fails without waiting");
}

pub async fn test_concurrent_borrows_stay_bounded(ctx: &TestContext) {
    println!("  🧪 test_concurrent_borrows_stay_bounded");

    const POOL_SIZE: u32 = 2;
    const BORROWERS: usize = 8;

    let registry = ctx.registry(POOL_SIZE);
    registry.connect(connect_params("bounded")).await.unwrap();

    let tasks = (0..BORROWERS).map(|i| {
        let registry = registry.clone();
        async move {
            let mut conn = registry.borrow("bounded").await?;
            sqlx::query("SELECT pg_sleep(0.05)")
                .execute(&mut *conn)
                .await?;
            if i % 3 == 0 {
                // Fails while the connection is held.
                sqlx::query("SELECT * FROM no_such_table")
                    .execute(&mut *conn)
                    .await?;
            }
            Ok::<_, PoolError>(())
        }
    });

    let results = join_all(tasks).await;
    let failures = results.iter().filter(|r| r.is_err()).count();
    assert_eq!(failures, 3, "borrowers 0, 3 and 6 should fail");

    let status = registry.pool_status("bounded").await.unwrap();
    assert!(
        status.peak_checked_out <= POOL_SIZE as usize,
        "peak {} exceeded pool size",
        status.peak_checked_out
    );
    assert_eq!(status.checked_out, 0);
    assert_eq!(status.borrows, BORROWERS as u64);
    assert_eq!(status.borrows, status.releases);

    registry.shutdown().await;
    println!("     ✓ At most {} checked out; every borrow returned", POOL_SIZE);
}

pub async fn test_release_on_panic(ctx: &TestContext) {
    println!("  🧪 test_release_on_panic");

    let registry = ctx.registry(1);
    registry.connect(connect_params("panicky")).await.unwrap();

    let task_registry = registry.clone();
    let joined = tokio::spawn(async move {
        let _conn = task_registry.borrow("panicky").await.unwrap();
        panic!("borrower gave up");
    })
    .await;
    assert!(joined.is_err());

    // The single connection must be available again.
    assert!(registry.is_connected("panicky").await);
    let status = registry.pool_status("panicky").await.unwrap();
    assert_eq!(status.checked_out, 0);
    assert_eq!(status.borrows, status.releases);

    registry.shutdown().await;
    println!("     ✓ Panicking borrower still returns its connection");
}

pub async fn test_connect_failure_inserts_nothing(ctx: &TestContext) {
    println!("  🧪 test_connect_failure_inserts_nothing");

    let registry = ctx.registry(2);
    let mut params = connect_params("wrong_password");
    params.password = "not-the-password".to_string();

    let err = registry.connect(params).await.unwrap_err();
    assert!(matches!(err, PoolError::ConnectionFailure { .. }));
    assert!(!registry.contains("wrong_password").await);

    println!("     ✓ Failed connect leaves the registry unchanged");
}

pub async fn test_borrow_times_out_when_pool_is_held(ctx: &TestContext) {
    println!("  🧪 test_borrow_times_out_when_pool_is_held");

    let registry = ctx.registry_with_timeout(1, Duration::from_secs(1));
    registry.connect(connect_params("single")).await.unwrap();

    let held = registry.borrow("single").await.unwrap();

    let err = registry.borrow("single").await.unwrap_err();
    assert!(
        matches!(err, PoolError::PoolExhausted { ref name, .. } if name == "single"),
        "unexpected error: {:?}",
        err
    );
    assert!(!registry.is_connected("single").await);

    drop(held);
    assert!(registry.borrow("single").await.is_ok());
    assert!(registry.is_connected("single").await);

    let status = registry.pool_status("single").await.unwrap();
    assert_eq!(status.checked_out, 0);
    assert_eq!(status.borrows, status.releases);

    registry.shutdown().await;
    println!("     ✓ Borrow gives up with PoolExhausted while the only connection is held");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Registry Tests");
    test_connect_then_listed(ctx).await;
    test_disconnect_twice(ctx).await;
    test_reconnect_replaces_pool(ctx).await;
    test_borrow_unknown_fails_fast(ctx).await;
    test_concurrent_borrows_stay_bounded(ctx).await;
    test_release_on_panic(ctx).await;
    test_connect_failure_inserts_nothing(ctx).await;
    test_borrow_times_out_when_pool_is_held(ctx).await;
}
