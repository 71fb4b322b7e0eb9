//! Error types for the MCP crate.

use sqlmagic_adapter_pg::PoolError;
use sqlmagic_core::ValidationError;
use thiserror::Error;

/// Errors that can occur in the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Transport error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised while running a single tool call.
///
/// These never reach the protocol as JSON-RPC errors; the executor renders
/// them as the text of the tool result.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool name is not in the catalog.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments did not match the tool's input schema.
    #[error("invalid arguments for tool {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Identifier or query validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `connect` could not open the pool.
    #[error("Connection failed: {0}")]
    ConnectFailed(#[source] PoolError),

    /// Result could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Registry or database failure.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl ToolError {
    /// Text returned to the client in place of a tool result.
    pub fn to_text(&self) -> String {
        match self {
            ToolError::UnknownTool(_) | ToolError::ConnectFailed(_) => self.to_string(),
            other => format!("Error: {}", other),
        }
    }

    /// Stable short name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::Validation(_) => "validation_error",
            ToolError::ConnectFailed(e) | ToolError::Pool(e) => e.kind(),
            ToolError::Serialization(_) => "serialization_error",
        }
    }
}

impl From<sqlx::Error> for ToolError {
    fn from(e: sqlx::Error) -> Self {
        ToolError::Pool(PoolError::QueryFailure(e))
    }
}
