//! Statistical tools: correlations, anomalies and time-series trends.
//!
//! Each tool reads at most `max_rows_limit` rows through a borrowed
//! connection and summarizes them in memory. The summaries are pure
//! functions over `f64` slices so they can be tested without a database.

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::request::{ColumnArgs, TableArgs, TimeSeriesArgs};
use sqlmagic_adapter_pg::introspect;
use sqlmagic_core::sanitize_identifier;
use sqlx::Row;

/// Minimum number of values for anomaly detection.
pub const MIN_ANOMALY_SAMPLES: usize = 10;
/// Absolute Z-score above which a value counts as an anomaly.
pub const ANOMALY_Z_THRESHOLD: f64 = 3.0;
/// Absolute Pearson coefficient above which a pair is reported.
pub const CORRELATION_THRESHOLD: f64 = 0.5;

pub async fn find_correlations(ctx: &ToolContext, args: TableArgs) -> Result<String, ToolError> {
    ctx.ensure_connected(&args.connection_name).await?;
    let table = sanitize_identifier(&args.table_name)?;

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let columns = introspect::numeric_columns(&mut conn, table).await?;
    if columns.len() < 2 {
        return Ok("Insufficient numeric columns".to_string());
    }

    let quoted: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let select = quoted
        .iter()
        .map(|c| format!("{}::double precision", c))
        .collect::<Vec<_>>()
        .join(", ");
    let not_null = quoted
        .iter()
        .map(|c| format!("{} IS NOT NULL", c))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "SELECT {} FROM {} WHERE {} LIMIT {}",
        select,
        table,
        not_null,
        ctx.max_rows()
    );

    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    if rows.is_empty() {
        return Ok("No data available".to_string());
    }

    let mut series: Vec<Vec<f64>> = vec![Vec::with_capacity(rows.len()); columns.len()];
    for row in &rows {
        for (i, values) in series.iter_mut().enumerate() {
            values.push(row.try_get::<f64, _>(i)?);
        }
    }

    Ok(correlation_report(&columns, &series))
}

pub async fn detect_anomalies(ctx: &ToolContext, args: ColumnArgs) -> Result<String, ToolError> {
    ctx.ensure_connected(&args.connection_name).await?;
    let table = sanitize_identifier(&args.table_name)?;
    let column = sanitize_identifier(&args.column_name)?;

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let sql = format!(
        "SELECT {col}::double precision FROM {table} WHERE {col} IS NOT NULL LIMIT {limit}",
        col = column,
        table = table,
        limit = ctx.max_rows()
    );
    let values: Vec<f64> = sqlx::query_scalar(&sql).fetch_all(&mut *conn).await?;

    Ok(anomaly_report(column, &values))
}

pub async fn time_series_analysis(
    ctx: &ToolContext,
    args: TimeSeriesArgs,
) -> Result<String, ToolError> {
    ctx.ensure_connected(&args.connection_name).await?;
    let table = sanitize_identifier(&args.table_name)?;
    let date = sanitize_identifier(&args.date_column)?;
    let value = sanitize_identifier(&args.value_column)?;

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let sql = format!(
        "SELECT {value}::double precision FROM {table} \
         WHERE {date} IS NOT NULL AND {value} IS NOT NULL \
         ORDER BY {date} LIMIT {limit}",
        value = value,
        table = table,
        date = date,
        limit = ctx.max_rows()
    );
    let values: Vec<f64> = sqlx::query_scalar(&sql).fetch_all(&mut *conn).await?;

    Ok(time_series_report(value, &values))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom.
fn std_dev(values: &[f64], ddof: usize) -> f64 {
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / (values.len() - ddof) as f64).sqrt()
}

/// Pearson coefficient of two equally long series.
///
/// `NaN` when either series has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let mx = mean(x);
    let my = mean(y);
    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    cov / (vx * vy).sqrt()
}

/// Report every column pair whose |r| exceeds [`CORRELATION_THRESHOLD`].
///
/// `series[i]` holds the values of `columns[i]`.
pub fn correlation_report(columns: &[String], series: &[Vec<f64>]) -> String {
    if columns.len() < 2 {
        return "Insufficient numeric columns".to_string();
    }
    if series.first().is_none_or(|s| s.is_empty()) {
        return "No data available".to_string();
    }

    let mut report = String::from("Strong correlations (>0.5):\n");
    let mut found = false;
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let r = pearson(&series[i], &series[j]);
            // NaN compares false and is never reported.
            if r.abs() > CORRELATION_THRESHOLD {
                report.push_str(&format!("• {} - {}: {:.3}\n", columns[i], columns[j], r));
                found = true;
            }
        }
    }
    if !found {
        report.push_str("No strong correlations found");
    }
    report
}

/// Number of values whose population Z-score exceeds [`ANOMALY_Z_THRESHOLD`].
pub fn count_anomalies(values: &[f64]) -> usize {
    if values.is_empty() {
        return 0;
    }
    let m = mean(values);
    let sd = std_dev(values, 0);
    if sd == 0.0 {
        return 0;
    }
    values
        .iter()
        .filter(|v| ((*v - m) / sd).abs() > ANOMALY_Z_THRESHOLD)
        .count()
}

pub fn anomaly_report(column: &str, values: &[f64]) -> String {
    if values.len() < MIN_ANOMALY_SAMPLES {
        return "Insufficient data for anomaly detection".to_string();
    }
    format!(
        "Anomalies in {}: {} detected (Z-score > 3)",
        column,
        count_anomalies(values)
    )
}

/// Summarize values already ordered by date.
pub fn time_series_report(column: &str, values: &[f64]) -> String {
    let (Some(first), Some(last)) = (values.first(), values.last()) else {
        return "Insufficient data for time series analysis".to_string();
    };
    if values.len() < 2 {
        return "Insufficient data for time series analysis".to_string();
    }

    let trend = if last > first { "increasing" } else { "decreasing" };
    format!(
        "Time series {}: {} points, trend: {}, mean: {:.2}, std: {:.2}",
        column,
        values.len(),
        trend,
        mean(values),
        std_dev(values, 1)
    )
}
