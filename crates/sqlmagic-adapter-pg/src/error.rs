//! Error types for the Postgres adapter.

use sqlmagic_core::ValidationError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the pool registry and the queries run through it.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A pool could not be established (unreachable host, rejected
    /// credentials, unknown database).
    #[error("Failed to connect '{name}': {source}")]
    ConnectionFailure {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    /// No active entry is registered under this name.
    #[error("Connection {0} not found or inactive")]
    ConnectionNotFound(String),

    /// Caller input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The database rejected or failed a well-formed request.
    #[error("Query failed: {0}")]
    QueryFailure(#[from] sqlx::Error),

    /// Every connection in the pool stayed checked out for the whole
    /// acquisition window.
    #[error("Connection pool '{name}' exhausted: no connection available within {timeout:?}")]
    PoolExhausted { name: String, timeout: Duration },

    /// The operation exceeded the configured query timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl PoolError {
    /// Stable short name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PoolError::ConnectionFailure { .. } => "connection_failure",
            PoolError::ConnectionNotFound(_) => "connection_not_found",
            PoolError::Validation(_) => "validation_error",
            PoolError::QueryFailure(_) => "query_failure",
            PoolError::PoolExhausted { .. } => "pool_exhausted",
            PoolError::Timeout(_) => "timeout",
        }
    }
}
