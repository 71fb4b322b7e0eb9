//! State shared by every tool routine.

use crate::cache::CatalogCache;
use crate::error::ToolError;
use sqlmagic_adapter_pg::{PoolError, PoolRegistry, ScopedConnection};
use sqlmagic_core::SqlMagicConfig;
use std::sync::Arc;

/// Registry, configuration and catalog cache handed to each routine.
#[derive(Clone)]
pub struct ToolContext {
    pub registry: Arc<PoolRegistry>,
    pub config: Arc<SqlMagicConfig>,
    pub cache: CatalogCache,
}

impl ToolContext {
    pub fn new(registry: Arc<PoolRegistry>, config: Arc<SqlMagicConfig>) -> Self {
        Self {
            registry,
            config,
            cache: CatalogCache::default(),
        }
    }

    /// Upper bound on rows any routine reads.
    pub fn max_rows(&self) -> u32 {
        self.config.max_rows_limit
    }

    /// Clamp a caller-supplied row limit to the server's row cap.
    pub fn cap_rows(&self, limit: u64) -> u32 {
        let max_rows = self.max_rows();
        u32::try_from(limit).map_or(max_rows, |limit| limit.min(max_rows))
    }

    /// Fail with `ConnectionNotFound` unless `name` is registered and live.
    pub async fn ensure_connected(&self, name: &str) -> Result<(), ToolError> {
        if self.registry.is_connected(name).await {
            Ok(())
        } else {
            Err(PoolError::ConnectionNotFound(name.to_string()).into())
        }
    }

    /// Borrow a connection of `name`; released when the guard drops.
    pub async fn borrow(&self, name: &str) -> Result<ScopedConnection, ToolError> {
        Ok(self.registry.borrow(name).await?)
    }
}
