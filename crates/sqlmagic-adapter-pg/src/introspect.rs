//! Catalog queries over `information_schema`.
//!
//! Every function takes an already-borrowed connection; none of them
//! acquire or release anything. Table names are bound as parameters where
//! the catalog allows it and sanitized where they must be interpolated.

use crate::error::PoolError;
use serde::Serialize;
use sqlmagic_core::sanitize_identifier;
use sqlx::postgres::PgConnection;
use sqlx::Row;

/// Catalog types treated as numeric by the analytics tools.
pub const NUMERIC_TYPES: &[&str] = &["integer", "bigint", "numeric", "real", "double precision"];

/// A table or view visible in the `public` schema.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    /// `BASE TABLE`, `VIEW`, ...
    pub table_type: String,
}

/// One column of a table, in ordinal order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// List tables and views of the `public` schema, ordered by name.
pub async fn list_tables(conn: &mut PgConnection) -> Result<Vec<TableInfo>, PoolError> {
    let rows = sqlx::query(
        r#"
        select table_name::text as table_name, table_type::text as table_type
        from information_schema.tables
        where table_schema = 'public'
        order by table_name
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| TableInfo {
            name: row.get("table_name"),
            table_type: row.get("table_type"),
        })
        .collect())
}

/// Describe the columns of `table`.
///
/// The name is resolved through `search_path` the same way an unqualified
/// `SELECT` would, so same-named tables in other schemas are ignored.
pub async fn describe_table(
    conn: &mut PgConnection,
    table: &str,
) -> Result<Vec<ColumnInfo>, PoolError> {
    let table = sanitize_identifier(table)?;

    let rows = sqlx::query(
        r#"
        with target as (
            select n.nspname::text as schema_name, c.relname::text as table_name
            from pg_class c
            join pg_namespace n on n.oid = c.relnamespace
            where c.oid = to_regclass($1)
        )
        select col.column_name::text as column_name,
               col.data_type::text as data_type,
               col.is_nullable::text as is_nullable
        from information_schema.columns col
        join target t on col.table_schema = t.schema_name and col.table_name = t.table_name
        order by col.ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let is_nullable: String = row.get("is_nullable");
            ColumnInfo {
                name: row.get("column_name"),
                data_type: row.get("data_type"),
                nullable: is_nullable == "YES",
            }
        })
        .collect())
}

/// Names of the columns of `table` whose type is in [`NUMERIC_TYPES`].
pub async fn numeric_columns(
    conn: &mut PgConnection,
    table: &str,
) -> Result<Vec<String>, PoolError> {
    let table = sanitize_identifier(table)?;
    let types: Vec<String> = NUMERIC_TYPES.iter().map(|t| t.to_string()).collect();

    let columns: Vec<String> = sqlx::query_scalar(
        r#"
        with target as (
            select n.nspname::text as schema_name, c.relname::text as table_name
            from pg_class c
            join pg_namespace n on n.oid = c.relnamespace
            where c.oid = to_regclass($1)
        )
        select col.column_name::text
        from information_schema.columns col
        join target t on col.table_schema = t.schema_name and col.table_name = t.table_name
        where col.data_type::text = any($2)
        order by col.ordinal_position
        "#,
    )
    .bind(table)
    .bind(types)
    .fetch_all(&mut *conn)
    .await?;

    Ok(columns)
}

/// `COUNT(*)` of `table`.
pub async fn count_rows(conn: &mut PgConnection, table: &str) -> Result<i64, PoolError> {
    let table = sanitize_identifier(table)?;
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Number of columns `table` has in the catalog.
pub async fn count_columns(conn: &mut PgConnection, table: &str) -> Result<i64, PoolError> {
    let table = sanitize_identifier(table)?;
    let count: i64 = sqlx::query_scalar(
        r#"
        with target as (
            select n.nspname::text as schema_name, c.relname::text as table_name
            from pg_class c
            join pg_namespace n on n.oid = c.relnamespace
            where c.oid = to_regclass($1)
        )
        select count(*)
        from information_schema.columns col
        join target t on col.table_schema = t.schema_name and col.table_name = t.table_name
        "#,
    )
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
