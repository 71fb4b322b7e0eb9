//! `sqlmagic check` - verify that a database is reachable.
//!
//! Opens a pool through the same registry the server uses, probes it, lists
//! the tables of the `public` schema and disconnects.

use anyhow::{Context, Result, bail};
use sqlmagic_adapter_pg::introspect;
use sqlmagic_adapter_pg::{ConnectParams, PoolRegistry, RegistryOptions};
use sqlmagic_core::SqlMagicConfig;

const CHECK_CONNECTION: &str = "check";

pub struct CheckTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

pub async fn run(config: &SqlMagicConfig, target: CheckTarget) -> Result<()> {
    let registry = PoolRegistry::new(RegistryOptions::from(config));
    let params = ConnectParams::new(
        CHECK_CONNECTION,
        &target.host,
        &target.database,
        target.username,
        target.password,
    )
    .with_port(target.port)
    .with_max_size(1);

    println!("🔌 Connecting to {}@{}:{}...", target.database, target.host, target.port);
    registry
        .connect(params)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", target.host, target.port))?;

    let result = probe(&registry).await;
    registry.disconnect(CHECK_CONNECTION).await;
    result
}

async fn probe(registry: &PoolRegistry) -> Result<()> {
    if !registry.is_connected(CHECK_CONNECTION).await {
        bail!("Connection opened but the liveness probe failed");
    }
    println!("✅ Connection is live");

    let mut conn = registry.borrow(CHECK_CONNECTION).await?;
    let tables = introspect::list_tables(&mut conn)
        .await
        .context("Failed to list tables")?;

    println!("\n📋 Tables ({}):", tables.len());
    for table in tables {
        println!("   • {} ({})", table.name, table.table_type);
    }
    Ok(())
}
