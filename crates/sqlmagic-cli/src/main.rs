use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlmagic_core::{SqlMagicConfig, Transport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sqlmagic", version, about = "PostgreSQL analytics over MCP")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "SQLMAGIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server.
    Serve {
        /// Transport to listen on: stdio or http
        #[arg(long)]
        transport: Option<Transport>,

        /// HTTP host (http transport only)
        #[arg(long)]
        host: Option<String>,

        /// HTTP port (http transport only)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the tool catalog as JSON.
    Tools,

    /// Connect to a database, probe it and list its tables.
    Check {
        #[arg(long)]
        host: String,

        #[arg(long, default_value_t = 5432)]
        port: u16,

        #[arg(long)]
        database: String,

        #[arg(long)]
        username: String,

        #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn init_tracing(config: &SqlMagicConfig) {
    // stdout carries JSON-RPC on the stdio transport.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.tracing_directive()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SqlMagicConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {:?}", path),
        None => "Failed to load configuration from the environment".to_string(),
    })?;

    if let Command::Serve {
        transport,
        host,
        port,
    } = &cli.cmd
    {
        if let Some(transport) = transport {
            config.mcp.transport = *transport;
        }
        if let Some(host) = host {
            config.mcp.host = host.clone();
        }
        if let Some(port) = port {
            config.mcp.port = *port;
        }
    }

    init_tracing(&config);

    match cli.cmd {
        Command::Serve { .. } => commands::serve::run(config).await?,
        Command::Tools => commands::tools::list()?,
        Command::Check {
            host,
            port,
            database,
            username,
            password,
        } => {
            commands::check::run(
                &config,
                commands::check::CheckTarget {
                    host,
                    port,
                    database,
                    username,
                    password,
                },
            )
            .await?
        }
    }

    Ok(())
}
