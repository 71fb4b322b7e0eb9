//! Decoding of arbitrary result rows into JSON values.

use crate::error::PoolError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use serde_json::{Value, json};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::{Column, Row, TypeInfo};

/// Rows of a query with their column names, decoded column by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryTable {
    pub fn from_rows(rows: &[PgRow]) -> Self {
        let columns = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| decode_value(row, i)).collect())
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Run `sql` as-is and decode every returned row.
///
/// The caller is responsible for `sql` being safe to run.
pub async fn fetch_table(conn: &mut PgConnection, sql: &str) -> Result<QueryTable, PoolError> {
    let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
    Ok(QueryTable::from_rows(&rows))
}

/// Like [`fetch_table`] but stops reading after `max_rows` rows.
pub async fn fetch_table_limited(
    conn: &mut PgConnection,
    sql: &str,
    max_rows: usize,
) -> Result<QueryTable, PoolError> {
    let mut stream = sqlx::query(sql).fetch(&mut *conn);
    let mut rows = Vec::new();
    while rows.len() < max_rows {
        match stream.try_next().await? {
            Some(row) => rows.push(row),
            None => break,
        }
    }
    Ok(QueryTable::from_rows(&rows))
}

/// Decode column `index` of `row` by its Postgres type name.
fn decode_value(row: &PgRow, index: usize) -> Value {
    let type_name = row.column(index).type_info().name().to_string();

    let decoded: Result<Value, sqlx::Error> = match type_name.as_str() {
        "BOOL" => row.try_get::<Option<bool>, _>(index).map(|v| json!(v)),
        "INT2" => row.try_get::<Option<i16>, _>(index).map(|v| json!(v)),
        "INT4" => row.try_get::<Option<i32>, _>(index).map(|v| json!(v)),
        "INT8" => row.try_get::<Option<i64>, _>(index).map(|v| json!(v)),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index).map(|v| json!(v)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index).map(|v| json!(v)),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(index)
            .map(|v| v.map_or(Value::Null, |d| Value::String(d.normalized().to_string()))),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)
            .map(|v| json!(v.map(|d| d.to_string()))),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)
            .map(|v| json!(v.map(|t| t.to_string()))),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .map(|v| json!(v.map(|t| t.to_string()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .map(|v| json!(v.map(|t| t.to_rfc3339()))),
        "UUID" => row
            .try_get::<Option<sqlx::types::Uuid>, _>(index)
            .map(|v| json!(v.map(|u| u.to_string()))),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(index)
            .map(|v| v.unwrap_or(Value::Null)),
        _ => row.try_get::<Option<String>, _>(index).map(|v| json!(v)),
    };

    decoded.unwrap_or_else(|_| Value::String(format!("<{}>", type_name.to_lowercase())))
}
