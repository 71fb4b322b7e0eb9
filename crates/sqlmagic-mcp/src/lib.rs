//! # sqlmagic-mcp
//!
//! MCP (Model Context Protocol) server exposing PostgreSQL exploration and
//! analytics as tools for AI agents.
//!
//! - **Named connections**: `connect` registers a bounded pool under a name
//!   that later calls refer to
//! - **Schema exploration**: tables, columns, samples, row counts
//! - **Read-only queries**: a single SELECT, capped in rows
//! - **Analytics**: correlations, Z-score anomalies, time-series trends
//! - **Multiple Transports**: stdio and HTTP
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (list tools / call tool)
//!       ▼
//! ┌────────────────────┐
//! │  SQLMagic MCP      │
//! │  1. Check args     │  ← JSON schema per tool
//! │  2. Typed request  │
//! │  3. Check conn     │  ← PoolRegistry
//! │  4. Borrow + query │  ← ScopedConnection
//! │  5. Render text    │
//! └─────────┬──────────┘
//!           │
//!           ▼
//!     Postgres (per connection name)
//! ```
//!
//! ## Example Usage
//!
//! ```ignore
//! use sqlmagic_adapter_pg::{PoolRegistry, RegistryOptions};
//! use sqlmagic_core::SqlMagicConfig;
//! use sqlmagic_mcp::McpServer;
//! use std::sync::Arc;
//!
//! let config = Arc::new(SqlMagicConfig::load(None)?);
//! let registry = Arc::new(PoolRegistry::new(RegistryOptions::from(config.as_ref())));
//! Arc::new(McpServer::new(config, registry)).run().await?;
//! ```

pub mod analytics;
pub mod basic;
pub mod cache;
pub mod context;
pub mod error;
pub mod executor;
pub mod format;
pub mod http_transport;
pub mod protocol;
pub mod request;
pub mod server;
pub mod tools;

// Re-export main types
pub use cache::CatalogCache;
pub use context::ToolContext;
pub use error::{McpError, ToolError};
pub use executor::{ExecutionResult, ToolExecutor};
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, ToolAnnotations,
    ToolContent, ToolDefinition,
};
pub use request::ToolRequest;
pub use server::McpServer;
pub use tools::ToolRegistry;
