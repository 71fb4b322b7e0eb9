//! Connection management and schema exploration tools.

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::format::{format_thousands, render_table};
use crate::request::{ConnectArgs, ConnectionArgs, QueryArgs, SampleArgs, TableArgs};
use sqlmagic_adapter_pg::introspect;
use sqlmagic_adapter_pg::rows::{fetch_table, fetch_table_limited};
use sqlmagic_adapter_pg::ConnectParams;
use sqlmagic_core::{ensure_single_select, sanitize_identifier};
use sqlx::Connection;

const TABLES_KEY: &str = "tables";

fn columns_key(table: &str) -> String {
    format!("columns:{}", table)
}

pub async fn connect(ctx: &ToolContext, args: ConnectArgs) -> Result<String, ToolError> {
    let ConnectArgs {
        connection_name,
        host,
        port,
        database,
        username,
        password,
    } = args;

    let params = ConnectParams::new(&connection_name, host, &database, username, password)
        .with_port(port);

    ctx.cache.invalidate_connection(&connection_name);
    ctx.registry
        .connect(params)
        .await
        .map_err(ToolError::ConnectFailed)?;

    Ok(format!("Connected to {} as {}", database, connection_name))
}

pub async fn disconnect(ctx: &ToolContext, args: ConnectionArgs) -> Result<String, ToolError> {
    ctx.cache.invalidate_connection(&args.connection_name);
    if ctx.registry.disconnect(&args.connection_name).await {
        Ok(format!("Disconnected {}", args.connection_name))
    } else {
        Ok(format!("Connection {} not found", args.connection_name))
    }
}

pub async fn list_connections(ctx: &ToolContext) -> Result<String, ToolError> {
    let connections = ctx.registry.list_connections().await;
    if connections.is_empty() {
        return Ok("No active connections".to_string());
    }

    let lines: Vec<String> = connections
        .iter()
        .map(|(name, info)| {
            format!("• {}: {}@{}:{}", name, info.database, info.host, info.port)
        })
        .collect();
    Ok(format!("Connections:\n{}", lines.join("\n")))
}

/// Counters of the metrics collector as pretty-printed JSON.
pub fn server_metrics(ctx: &ToolContext) -> Result<String, ToolError> {
    let snapshot = ctx.registry.metrics().snapshot();
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

pub async fn explore_tables(ctx: &ToolContext, args: ConnectionArgs) -> Result<String, ToolError> {
    ctx.ensure_connected(&args.connection_name).await?;

    if let Some(hit) = ctx.cache.get(&args.connection_name, TABLES_KEY).await {
        return Ok(hit);
    }

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let tables = introspect::list_tables(&mut conn).await?;

    let lines: Vec<String> = tables
        .iter()
        .map(|t| format!("• {} ({})", t.name, t.table_type))
        .collect();
    let text = format!("Tables:\n{}", lines.join("\n"));

    ctx.cache.insert(&args.connection_name, TABLES_KEY, text.clone()).await;
    Ok(text)
}

pub async fn describe_table(ctx: &ToolContext, args: TableArgs) -> Result<String, ToolError> {
    ctx.ensure_connected(&args.connection_name).await?;
    let table = sanitize_identifier(&args.table_name)?;

    let key = columns_key(table);
    if let Some(hit) = ctx.cache.get(&args.connection_name, &key).await {
        return Ok(hit);
    }

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let columns = introspect::describe_table(&mut conn, table).await?;

    let lines: Vec<String> = columns
        .iter()
        .map(|c| {
            let null = if c.nullable { "NULL" } else { "NOT NULL" };
            format!("• {}: {} {}", c.name, c.data_type, null)
        })
        .collect();
    let text = format!("Structure of {}:\n{}", table, lines.join("\n"));

    ctx.cache.insert(&args.connection_name, &key, text.clone()).await;
    Ok(text)
}

pub async fn sample_data(ctx: &ToolContext, args: SampleArgs) -> Result<String, ToolError> {
    ctx.ensure_connected(&args.connection_name).await?;
    let table = sanitize_identifier(&args.table_name)?;
    let limit = ctx.cap_rows(args.limit);

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let rows = fetch_table(&mut conn, &format!("SELECT * FROM {} LIMIT {}", table, limit)).await?;

    if rows.is_empty() {
        return Ok("No data found".to_string());
    }
    Ok(format!(
        "Sample from {} ({} rows):\n{}",
        table,
        rows.len(),
        render_table(&rows)
    ))
}

pub async fn analyze_data(ctx: &ToolContext, args: TableArgs) -> Result<String, ToolError> {
    ctx.ensure_connected(&args.connection_name).await?;
    let table = sanitize_identifier(&args.table_name)?;

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let rows = introspect::count_rows(&mut conn, table).await?;
    let columns = introspect::count_columns(&mut conn, table).await?;

    Ok(format!(
        "Analysis of {}: {} rows, {} columns",
        table,
        format_thousands(rows),
        columns
    ))
}

/// Run a caller-supplied SELECT.
///
/// The text is checked before the connection is touched, so a rejected query
/// never reaches the database. Accepted queries run in a read-only
/// transaction that is always rolled back.
pub async fn execute_query(ctx: &ToolContext, args: QueryArgs) -> Result<String, ToolError> {
    ensure_single_select(&args.query)?;
    ctx.ensure_connected(&args.connection_name).await?;

    let max_rows = ctx.max_rows();
    let limit = ctx.cap_rows(args.limit);
    let sql = with_limit(&args.query, limit);

    let mut conn = ctx.borrow(&args.connection_name).await?;
    let mut tx = conn.begin().await?;
    sqlx::query("SET TRANSACTION READ ONLY")
        .execute(&mut *tx)
        .await?;
    let rows = fetch_table_limited(&mut tx, &sql, max_rows as usize).await?;
    tx.rollback().await?;

    if rows.is_empty() {
        return Ok("No data found".to_string());
    }
    Ok(format!(
        "Query results ({} rows):\n{}",
        rows.len(),
        render_table(&rows)
    ))
}

/// Append `LIMIT n` unless the query already mentions a limit.
fn with_limit(query: &str, limit: u32) -> String {
    if query.to_uppercase().contains("LIMIT") {
        query.to_string()
    } else {
        format!("{} LIMIT {}", query.trim().trim_end_matches(';').trim_end(), limit)
    }
}
