//! `sqlmagic serve` - run the MCP server on stdio or HTTP.

use anyhow::{Context, Result};
use sqlmagic_adapter_pg::{PoolRegistry, RegistryOptions};
use sqlmagic_core::SqlMagicConfig;
use sqlmagic_mcp::McpServer;
use std::sync::Arc;
use tracing::info;

pub async fn run(config: SqlMagicConfig) -> Result<()> {
    info!(
        transport = ?config.mcp.transport,
        max_connections = config.max_connections,
        query_timeout = config.query_timeout,
        max_rows_limit = config.max_rows_limit,
        "Starting SQLMagic"
    );

    let registry = Arc::new(PoolRegistry::new(RegistryOptions::from(&config)));
    let server = Arc::new(McpServer::new(Arc::new(config), registry));

    server.run().await.context("MCP server stopped with an error")?;

    info!("SQLMagic stopped");
    Ok(())
}
