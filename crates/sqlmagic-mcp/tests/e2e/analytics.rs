//! Correlation, anomaly and time-series tool tests.

use super::common::*;
use serde_json::json;

pub async fn test_find_correlations(ctx: &TestContext) {
    println!("  🧪 test_find_correlations");

    let executor = connected_executor(ctx, "stats").await;

    let result = executor
        .execute(
            "find_correlations",
            json!({"connection_name": "stats", "table_name": "measurements"}),
        )
        .await;
    assert_success(&result, "find_correlations should succeed");
    assert!(result.text.starts_with("Strong correlations (>0.5):\n"));
    assert!(result.text.contains("• x - y: 1.000"));
    assert!(!result.text.contains("- z:"), "z is only weakly correlated");

    let single = executor
        .execute(
            "find_correlations",
            json!({"connection_name": "stats", "table_name": "empty_table"}),
        )
        .await;
    assert_eq!(single.text, "Insufficient numeric columns");

    println!("     ✓ Strong pairs reported, weak pairs and thin tables skipped");
}

pub async fn test_detect_anomalies(ctx: &TestContext) {
    println!("  🧪 test_detect_anomalies");

    let executor = connected_executor(ctx, "stats").await;

    let result = executor
        .execute(
            "detect_anomalies",
            json!({
                "connection_name": "stats",
                "table_name": "sensor_readings",
                "column_name": "reading"
            }),
        )
        .await;
    assert_eq!(result.text, "Anomalies in reading: 1 detected (Z-score > 3)");

    let few = executor
        .execute(
            "detect_anomalies",
            json!({
                "connection_name": "stats",
                "table_name": "measurements",
                "column_name": "x"
            }),
        )
        .await;
    assert_eq!(few.text, "Insufficient data for anomaly detection");

    let invalid = executor
        .execute(
            "detect_anomalies",
            json!({
                "connection_name": "stats",
                "table_name": "sensor_readings",
                "column_name": "reading-1"
            }),
        )
        .await;
    assert_error_prefix(&invalid, "Error: Invalid identifier: reading-1");

    println!("     ✓ Single outlier found, small samples refused");
}

pub async fn test_time_series(ctx: &TestContext) {
    println!("  🧪 test_time_series");

    let executor = connected_executor(ctx, "stats").await;

    let result = executor
        .execute(
            "time_series_analysis",
            json!({
                "connection_name": "stats",
                "table_name": "daily_sales",
                "date_column": "day",
                "value_column": "amount"
            }),
        )
        .await;
    assert_eq!(
        result.text,
        "Time series amount: 3 points, trend: increasing, mean: 20.00, std: 10.00"
    );

    let empty = executor
        .execute(
            "time_series_analysis",
            json!({
                "connection_name": "stats",
                "table_name": "empty_table",
                "date_column": "id",
                "value_column": "id"
            }),
        )
        .await;
    assert_eq!(empty.text, "Insufficient data for time series analysis");

    println!("     ✓ Trend computed over date-ordered non-null rows");
}

pub async fn test_metrics_after_calls(ctx: &TestContext) {
    println!("  🧪 test_metrics_after_calls");

    let executor = connected_executor(ctx, "stats").await;
    let _ = executor
        .execute(
            "analyze_data",
            json!({"connection_name": "stats", "table_name": "measurements"}),
        )
        .await;

    let snapshot = executor.metrics().snapshot();
    assert_eq!(snapshot.connections_created, 1);
    assert_eq!(snapshot.queries_executed, 2);
    assert_eq!(snapshot.borrows, snapshot.releases);

    println!("     ✓ Metrics count calls and balanced borrows");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Analytics Tool Tests");
    test_find_correlations(ctx).await;
    test_detect_anomalies(ctx).await;
    test_time_series(ctx).await;
    test_metrics_after_calls(ctx).await;
}
