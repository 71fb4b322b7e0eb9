//! Shared test infrastructure for SQLMagic end-to-end tests.
//!
//! This module provides:
//! - Docker container management for PostgreSQL
//! - Schema and seed data for the analytics fixtures
//! - Helpers to build registries and executors against the container

use serde_json::{Value, json};
use sqlmagic_adapter_pg::{ConnectParams, PoolRegistry, RegistryOptions};
use sqlmagic_core::SqlMagicConfig;
use sqlmagic_mcp::executor::{ExecutionResult, ToolExecutor};
use sqlx::PgPool;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// DOCKER CONTAINER CONFIGURATION
// =============================================================================

pub const CONTAINER_NAME: &str = "sqlmagic_test_postgres";
pub const POSTGRES_HOST: &str = "127.0.0.1";
pub const POSTGRES_PORT: u16 = 5433;
pub const POSTGRES_USER: &str = "postgres";
pub const POSTGRES_PASSWORD: &str = "sqlmagic_test_password";
pub const DATABASE_NAME: &str = "sqlmagic_test";

pub fn database_url() -> String {
    format!(
        "postgres://{}:{}@{}:{}/{}",
        POSTGRES_USER, POSTGRES_PASSWORD, POSTGRES_HOST, POSTGRES_PORT, DATABASE_NAME
    )
}

// =============================================================================
// DOCKER CONTAINER MANAGEMENT
// =============================================================================

/// Start a PostgreSQL container for testing
pub fn start_postgres_container() -> Result<(), String> {
    let output = Command::new("docker")
        .args(["ps", "-a", "-q", "-f", &format!("name={}", CONTAINER_NAME)])
        .output()
        .map_err(|e| format!("Failed to check existing container: {}", e))?;

    if !String::from_utf8_lossy(&output.stdout).trim().is_empty() {
        let _ = Command::new("docker")
            .args(["rm", "-f", CONTAINER_NAME])
            .output();
    }

    let status = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            CONTAINER_NAME,
            "-e",
            &format!("POSTGRES_PASSWORD={}", POSTGRES_PASSWORD),
            "-e",
            &format!("POSTGRES_DB={}", DATABASE_NAME),
            "-p",
            &format!("{}:5432", POSTGRES_PORT),
            "postgres:16-alpine",
        ])
        .status()
        .map_err(|e| format!("Failed to start container: {}", e))?;

    if !status.success() {
        return Err("Failed to start PostgreSQL container".to_string());
    }

    Ok(())
}

/// Stop and remove the PostgreSQL container
pub fn stop_postgres_container() {
    let _ = Command::new("docker")
        .args(["rm", "-f", CONTAINER_NAME])
        .output();
}

/// Wait for PostgreSQL to be ready
pub async fn wait_for_postgres() -> Result<PgPool, String> {
    for attempt in 1..=30 {
        match PgPool::connect(&database_url()).await {
            Ok(pool) => {
                if sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok() {
                    println!("✅ PostgreSQL ready after {} attempts", attempt);
                    return Ok(pool);
                }
            }
            Err(_) => {
                if attempt % 5 == 0 {
                    println!("⏳ Waiting for PostgreSQL... (attempt {})", attempt);
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    Err("PostgreSQL did not become ready in time".to_string())
}

// =============================================================================
// DATABASE INITIALIZATION
// =============================================================================

const SCHEMA_SQL: &str = r#"
CREATE TABLE measurements (
    id          serial PRIMARY KEY,
    x           integer NOT NULL,
    y           double precision NOT NULL,
    z           numeric,
    label       text
);

CREATE TABLE sensor_readings (
    id          serial PRIMARY KEY,
    reading     double precision
);

CREATE TABLE daily_sales (
    day         date,
    amount      numeric(10, 2)
);

CREATE TABLE empty_table (
    id          integer
);

CREATE VIEW measurement_labels AS SELECT id, label FROM measurements;

-- Same table name outside the search path; catalog lookups must ignore it.
CREATE SCHEMA archive;
CREATE TABLE archive.measurements (
    c           integer,
    d           integer,
    note        text
);
"#;

const SEED_SQL: &str = r#"
INSERT INTO measurements (x, y, z, label) VALUES
    (1, 2.0, 10, 'a'),
    (3, 4.0, 7, 'b'),
    (5, 6.0, 12, NULL);

INSERT INTO sensor_readings (reading)
SELECT g::double precision FROM generate_series(0, 49) AS g;
INSERT INTO sensor_readings (reading) VALUES (100), (NULL);

INSERT INTO archive.measurements (c, d, note) VALUES (1, 9, 'old');

INSERT INTO daily_sales (day, amount) VALUES
    ('2025-01-03', 30.00),
    ('2025-01-01', 10.00),
    ('2025-01-02', 20.00),
    (NULL, 99.00);
"#;

pub async fn initialize_database(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    sqlx::raw_sql(SEED_SQL).execute(pool).await?;
    println!("✅ Database initialized with schema and seed data");
    Ok(())
}

// =============================================================================
// TEST CONTEXT
// =============================================================================

pub struct TestContext {
    pub pool: PgPool,
}

impl TestContext {
    pub async fn setup() -> Result<Self, String> {
        start_postgres_container()?;
        let pool = wait_for_postgres().await?;
        initialize_database(&pool)
            .await
            .map_err(|e| format!("Failed to initialize database: {}", e))?;
        Ok(Self { pool })
    }

    /// Fresh registry with pools capped at `max_connections`.
    pub fn registry(&self, max_connections: u32) -> Arc<PoolRegistry> {
        self.registry_with_timeout(max_connections, Duration::from_secs(10))
    }

    /// Fresh registry whose borrows give up after `acquire_timeout`.
    pub fn registry_with_timeout(
        &self,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Arc<PoolRegistry> {
        Arc::new(PoolRegistry::new(RegistryOptions {
            max_connections,
            acquire_timeout,
        }))
    }

    /// Executor over a fresh registry and default configuration.
    pub fn executor(&self) -> ToolExecutor {
        self.executor_with(SqlMagicConfig::default())
    }

    /// Executor over a fresh registry and `config`.
    pub fn executor_with(&self, config: SqlMagicConfig) -> ToolExecutor {
        let registry = Arc::new(PoolRegistry::new(RegistryOptions::from(&config)));
        ToolExecutor::new(registry, Arc::new(config))
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        stop_postgres_container();
        println!("🧹 Cleaned up PostgreSQL container");
    }
}

// =============================================================================
// CONNECTION HELPERS
// =============================================================================

pub fn connect_params(name: &str) -> ConnectParams {
    ConnectParams::new(
        name,
        POSTGRES_HOST,
        DATABASE_NAME,
        POSTGRES_USER,
        POSTGRES_PASSWORD,
    )
    .with_port(POSTGRES_PORT)
}

pub fn connect_arguments(name: &str) -> Value {
    json!({
        "connection_name": name,
        "host": POSTGRES_HOST,
        "port": POSTGRES_PORT,
        "database": DATABASE_NAME,
        "username": POSTGRES_USER,
        "password": POSTGRES_PASSWORD
    })
}

/// Executor with `name` already connected.
pub async fn connected_executor(ctx: &TestContext, name: &str) -> ToolExecutor {
    let executor = ctx.executor();
    let result = executor.execute("connect", connect_arguments(name)).await;
    assert_success(&result, "connect should succeed");
    executor
}

// =============================================================================
// RESULT HELPERS
// =============================================================================

/// Assert that a result is successful
pub fn assert_success(result: &ExecutionResult, msg: &str) {
    assert!(result.success, "{}: {:?}", msg, result);
}

/// Assert that a result is an error whose text starts with `prefix`
pub fn assert_error_prefix(result: &ExecutionResult, prefix: &str) {
    assert!(!result.success, "expected an error, got: {:?}", result);
    assert!(
        result.text.starts_with(prefix),
        "expected text starting with {:?}, got {:?}",
        prefix,
        result.text
    );
}
