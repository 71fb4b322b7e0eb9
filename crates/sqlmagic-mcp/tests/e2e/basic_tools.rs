//! Connection management, schema exploration and query tool tests.

use super::common::*;
use serde_json::json;
use sqlmagic_core::SqlMagicConfig;

pub async fn test_connect_tool(ctx: &TestContext) {
    println!("  🧪 test_connect_tool");

    let executor = ctx.executor();
    let result = executor.execute("connect", connect_arguments("shop")).await;
    assert_success(&result, "connect should succeed");
    assert_eq!(result.text, format!("Connected to {} as shop", DATABASE_NAME));

    let listed = executor.execute("list_connections", json!({})).await;
    assert_eq!(
        listed.text,
        format!(
            "Connections:\n• shop: {}@{}:{}",
            DATABASE_NAME, POSTGRES_HOST, POSTGRES_PORT
        )
    );

    let closed = executor
        .execute("disconnect", json!({"connection_name": "shop"}))
        .await;
    assert_eq!(closed.text, "Disconnected shop");

    let after = executor
        .execute("explore_tables", json!({"connection_name": "shop"}))
        .await;
    assert_error_prefix(&after, "Error: Connection shop not found or inactive");

    println!("     ✓ connect, list_connections and disconnect round out a session");
}

pub async fn test_explore_tables(ctx: &TestContext) {
    println!("  🧪 test_explore_tables");

    let executor = connected_executor(ctx, "main").await;
    let result = executor
        .execute("explore_tables", json!({"connection_name": "main"}))
        .await;

    assert_success(&result, "explore_tables should succeed");
    assert!(result.text.starts_with("Tables:\n"));
    assert!(result.text.contains("• daily_sales (BASE TABLE)"));
    assert!(result.text.contains("• measurement_labels (VIEW)"));
    assert!(result.text.contains("• measurements (BASE TABLE)"));

    println!("     ✓ Tables and views listed with their types");
}

pub async fn test_describe_table_is_cached(ctx: &TestContext) {
    println!("  🧪 test_describe_table_is_cached");

    let executor = connected_executor(ctx, "main").await;
    let args = json!({"connection_name": "main", "table_name": "measurements"});

    let first = executor.execute("describe_table", args.clone()).await;
    assert_success(&first, "describe_table should succeed");
    assert_eq!(
        first.text,
        "Structure of measurements:\n\
         • id: integer NOT NULL\n\
         • x: integer NOT NULL\n\
         • y: double precision NOT NULL\n\
         • z: numeric NULL\n\
         • label: text NULL"
    );

    let borrows_before = executor.metrics().snapshot().borrows;
    let second = executor.execute("describe_table", args).await;
    assert_eq!(second, first);
    // Only the liveness probe borrows on a cache hit.
    assert_eq!(executor.metrics().snapshot().borrows, borrows_before + 1);

    let invalid = executor
        .execute(
            "describe_table",
            json!({"connection_name": "main", "table_name": "users; DROP TABLE x"}),
        )
        .await;
    assert_error_prefix(&invalid, "Error: Invalid identifier: users; DROP TABLE x");

    println!("     ✓ Columns described, cached, and identifiers validated");
}

pub async fn test_sample_and_analyze(ctx: &TestContext) {
    println!("  🧪 test_sample_and_analyze");

    let executor = connected_executor(ctx, "main").await;

    let sample = executor
        .execute(
            "sample_data",
            json!({"connection_name": "main", "table_name": "measurements", "limit": 2}),
        )
        .await;
    assert_success(&sample, "sample_data should succeed");
    assert!(sample.text.starts_with("Sample from measurements (2 rows):\n"));
    assert!(sample.text.contains("label"));

    let empty = executor
        .execute(
            "sample_data",
            json!({"connection_name": "main", "table_name": "empty_table"}),
        )
        .await;
    assert_eq!(empty.text, "No data found");

    let analysis = executor
        .execute(
            "analyze_data",
            json!({"connection_name": "main", "table_name": "sensor_readings"}),
        )
        .await;
    assert_eq!(analysis.text, "Analysis of sensor_readings: 52 rows, 2 columns");

    println!("     ✓ Sampling caps rows and analysis counts rows and columns");
}

pub async fn test_execute_query(ctx: &TestContext) {
    println!("  🧪 test_execute_query");

    let executor = connected_executor(ctx, "main").await;

    let result = executor
        .execute(
            "execute_query",
            json!({
                "connection_name": "main",
                "query": "SELECT x, label FROM measurements ORDER BY x",
                "limit": 2
            }),
        )
        .await;
    assert_success(&result, "SELECT should succeed");
    assert_eq!(
        result.text,
        "Query results (2 rows):\nx label\n1     a\n3     b"
    );

    let nulls = executor
        .execute(
            "execute_query",
            json!({
                "connection_name": "main",
                "query": "SELECT label FROM measurements WHERE x = 5"
            }),
        )
        .await;
    assert!(nulls.text.ends_with("NULL"));

    let rejected = executor
        .execute(
            "execute_query",
            json!({"connection_name": "main", "query": "DELETE FROM measurements"}),
        )
        .await;
    assert_eq!(rejected.text, "Error: Only SELECT queries are allowed");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM measurements")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(count, 3, "rejected query must not touch the table");

    let broken = executor
        .execute(
            "execute_query",
            json!({"connection_name": "main", "query": "SELECT * FROM missing_table"}),
        )
        .await;
    assert_error_prefix(&broken, "Error: Query failed:");

    println!("     ✓ SELECTs run with a LIMIT, everything else is refused");
}

pub async fn test_other_schema_is_ignored(ctx: &TestContext) {
    println!("  🧪 test_other_schema_is_ignored");

    let executor = connected_executor(ctx, "main").await;

    let described = executor
        .execute(
            "describe_table",
            json!({"connection_name": "main", "table_name": "measurements"}),
        )
        .await;
    assert_success(&described, "describe_table should succeed");
    assert!(!described.text.contains("• c:"), "archive columns leaked: {}", described.text);
    assert!(!described.text.contains("• note:"));

    let analysis = executor
        .execute(
            "analyze_data",
            json!({"connection_name": "main", "table_name": "measurements"}),
        )
        .await;
    assert_eq!(analysis.text, "Analysis of measurements: 3 rows, 5 columns");

    let correlations = executor
        .execute(
            "find_correlations",
            json!({"connection_name": "main", "table_name": "measurements"}),
        )
        .await;
    assert_success(&correlations, "find_correlations should only see public columns");
    assert!(!correlations.text.contains("c -"));

    println!("     ✓ Same-named table in another schema does not leak into the catalog");
}

pub async fn test_select_into_is_refused(ctx: &TestContext) {
    println!("  🧪 test_select_into_is_refused");

    let executor = connected_executor(ctx, "main").await;

    for query in [
        "SELECT * INTO stolen FROM measurements",
        "SELECT id FROM measurements FOR UPDATE",
    ] {
        let result = executor
            .execute(
                "execute_query",
                json!({"connection_name": "main", "query": query}),
            )
            .await;
        assert_eq!(result.text, "Error: Query must be read-only", "{}", query);
    }

    let created: Option<String> = sqlx::query_scalar("SELECT to_regclass('public.stolen')::text")
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(created, None, "SELECT INTO must not create a table");

    println!("     ✓ Writing and locking SELECTs are refused");
}

pub async fn test_slow_query_times_out(ctx: &TestContext) {
    println!("  🧪 test_slow_query_times_out");

    let config = SqlMagicConfig {
        query_timeout: 1,
        ..SqlMagicConfig::default()
    };
    let executor = ctx.executor_with(config);
    let connected = executor.execute("connect", connect_arguments("slow")).await;
    assert_success(&connected, "connect should succeed");

    let result = executor
        .execute(
            "execute_query",
            json!({"connection_name": "slow", "query": "SELECT pg_sleep(3)"}),
        )
        .await;
    assert_error_prefix(&result, "Error: Operation timed out after 1s");

    // The connection abandoned mid-query is not leaked.
    let status = executor.registry().pool_status("slow").await.unwrap();
    assert_eq!(status.borrows, status.releases);
    assert_eq!(executor.metrics().snapshot().errors, 1);

    executor.registry().shutdown().await;
    println!("     ✓ Queries past the configured timeout are cut off");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Basic Tool Tests");
    test_connect_tool(ctx).await;
    test_explore_tables(ctx).await;
    test_describe_table_is_cached(ctx).await;
    test_sample_and_analyze(ctx).await;
    test_execute_query(ctx).await;
    test_other_schema_is_ignored(ctx).await;
    test_select_into_is_refused(ctx).await;
    test_slow_query_times_out(ctx).await;
}
