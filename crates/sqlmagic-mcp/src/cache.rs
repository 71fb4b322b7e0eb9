//! Time-bounded cache for catalog lookups.
//!
//! Entries are keyed by connection name plus a lookup key and expire after a
//! fixed TTL. Reconnecting or disconnecting a name drops all of its entries.

use moka::future::Cache;
use std::time::Duration;

/// Default lifetime of a cached entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Upper bound on cached entries across all connections.
const DEFAULT_CAPACITY: u64 = 10_000;

type CacheKey = (String, String);

/// Rendered catalog text, scoped per connection.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, String>,
    ttl: Duration,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_CAPACITY)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();

        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key` under `connection`, if any.
    pub async fn get(&self, connection: &str, key: &str) -> Option<String> {
        self.cache
            .get(&(connection.to_string(), key.to_string()))
            .await
    }

    pub async fn insert(&self, connection: &str, key: &str, value: String) {
        self.cache
            .insert((connection.to_string(), key.to_string()), value)
            .await;
    }

    /// Drop every entry of `connection`.
    pub fn invalidate_connection(&self, connection: &str) {
        let target = connection.to_string();
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |(conn, _), _| *conn == target)
        {
            tracing::warn!(error = %e, connection, "Scoped invalidation failed, clearing catalog cache");
            self.cache.invalidate_all();
        }
    }

    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate number of live entries after pending maintenance runs.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
