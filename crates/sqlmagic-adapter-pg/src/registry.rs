//! Named connection pools and scoped connection borrowing.
//!
//! ## Invariants
//!
//! - A name maps to at most one pool. Pool and metadata are inserted and
//!   removed together, inside one write-lock critical section.
//! - Pools are created and closed outside the lock, so a slow handshake on
//!   one name never blocks borrowers of another.
//! - Whoever removes an entry from the map is the only one that closes it.
//!   Concurrent `connect`/`disconnect` on the same name therefore cannot
//!   double-close or leave a half-built entry behind.
//! - A [`ScopedConnection`] owns its physical connection exclusively and
//!   returns it to the pool it came from when dropped.

use crate::error::PoolError;
use crate::metrics::MetricsCollector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlmagic_core::{SqlMagicConfig, ValidationError};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Registry-wide pool settings.
#[derive(Debug, Clone, Copy)]
pub struct RegistryOptions {
    /// Default upper bound of each pool.
    pub max_connections: u32,
    /// How long `connect` and `borrow` wait for a connection.
    pub acquire_timeout: Duration,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&SqlMagicConfig> for RegistryOptions {
    fn from(config: &SqlMagicConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            acquire_timeout: config.query_timeout_duration(),
        }
    }
}

/// Everything needed to open a named pool.
#[derive(Clone)]
pub struct ConnectParams {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    /// Overrides [`RegistryOptions::max_connections`] for this pool.
    pub max_size: Option<u32>,
}

impl ConnectParams {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: 5432,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            max_size: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = Some(max_size);
        self
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

// Manual impl keeps the password out of logs.
impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("max_size", &self.max_size)
            .finish()
    }
}

/// Descriptive metadata of a named connection, safe to hand to callers.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub max_size: u32,
    pub connected_at: DateTime<Utc>,
}

/// Live occupancy of one pool.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open physical connections (idle and checked out).
    pub size: u32,
    pub idle: usize,
    pub max_size: u32,
    /// Connections currently held by a [`ScopedConnection`].
    pub checked_out: usize,
    /// Highest `checked_out` value observed since the pool was created.
    pub peak_checked_out: usize,
    pub borrows: u64,
    pub releases: u64,
}

#[derive(Debug, Default)]
struct BorrowCounters {
    checked_out: AtomicUsize,
    peak: AtomicUsize,
    borrows: AtomicU64,
    releases: AtomicU64,
}

struct ConnectionEntry {
    pool: PgPool,
    info: ConnectionInfo,
    counters: Arc<BorrowCounters>,
}

/// Owner of every named pool in the process.
pub struct PoolRegistry {
    entries: RwLock<HashMap<String, ConnectionEntry>>,
    options: RegistryOptions,
    metrics: Arc<MetricsCollector>,
}

impl PoolRegistry {
    /// Create an empty registry with its own metrics collector.
    pub fn new(options: RegistryOptions) -> Self {
        Self::with_metrics(options, Arc::new(MetricsCollector::new()))
    }

    /// Create an empty registry that reports into `metrics`.
    pub fn with_metrics(options: RegistryOptions, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            options,
            metrics,
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Open a pool and register it under `params.name`.
    ///
    /// An existing entry with the same name is replaced and its pool
    /// closed. On failure nothing is registered and any prior entry under
    /// the name is left untouched.
    pub async fn connect(&self, params: ConnectParams) -> Result<(), PoolError> {
        if params.name.trim().is_empty() {
            return Err(ValidationError::Empty("connection_name").into());
        }

        let max_size = params
            .max_size
            .unwrap_or(self.options.max_connections)
            .max(1);

        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_size)
            .acquire_timeout(self.options.acquire_timeout)
            .connect_with(params.connect_options())
            .await
            .map_err(|source| {
                tracing::error!(
                    connection = %params.name,
                    host = %params.host,
                    database = %params.database,
                    error = %source,
                    "Connection failed"
                );
                PoolError::ConnectionFailure {
                    name: params.name.clone(),
                    source,
                }
            })?;

        self.metrics.record_connection();

        let entry = ConnectionEntry {
            pool,
            info: ConnectionInfo {
                host: params.host.clone(),
                port: params.port,
                database: params.database.clone(),
                username: params.username.clone(),
                max_size,
                connected_at: Utc::now(),
            },
            counters: Arc::new(BorrowCounters::default()),
        };

        let previous = {
            let mut entries = self.entries.write().await;
            entries.insert(params.name.clone(), entry)
        };

        if let Some(previous) = previous {
            tracing::info!(connection = %params.name, "Replacing existing connection pool");
            self.close_pool(&params.name, previous.pool).await;
        }

        tracing::info!(
            connection = %params.name,
            database = %params.database,
            max_size,
            "Connected to {} as {}",
            params.database,
            params.name
        );
        Ok(())
    }

    /// Close and forget the pool registered under `name`.
    ///
    /// Returns `false` when nothing was registered; that is not an error.
    pub async fn disconnect(&self, name: &str) -> bool {
        let removed = {
            let mut entries = self.entries.write().await;
            entries.remove(name)
        };

        match removed {
            Some(entry) => {
                self.close_pool(name, entry.pool).await;
                tracing::info!(connection = %name, "Disconnected {}", name);
                true
            }
            None => false,
        }
    }

    /// Check out one connection from the pool registered under `name`.
    ///
    /// Waits at most [`RegistryOptions::acquire_timeout`] for a free
    /// connection. The returned handle goes back to the same pool when it
    /// is dropped.
    pub async fn borrow(&self, name: &str) -> Result<ScopedConnection, PoolError> {
        let (pool, counters) = {
            let entries = self.entries.read().await;
            let entry = entries
                .get(name)
                .ok_or_else(|| PoolError::ConnectionNotFound(name.to_string()))?;
            (entry.pool.clone(), entry.counters.clone())
        };

        let conn = pool.acquire().await.map_err(|e| match e {
            sqlx::Error::PoolTimedOut => PoolError::PoolExhausted {
                name: name.to_string(),
                timeout: self.options.acquire_timeout,
            },
            // Disconnected between the lookup and the acquire.
            sqlx::Error::PoolClosed => PoolError::ConnectionNotFound(name.to_string()),
            other => PoolError::QueryFailure(other),
        })?;

        Ok(ScopedConnection::new(
            name.to_string(),
            conn,
            counters,
            self.metrics.clone(),
        ))
    }

    /// Probe `name` with `SELECT 1` on a borrowed connection.
    ///
    /// Any failure, including an unknown name, yields `false`.
    pub async fn is_connected(&self, name: &str) -> bool {
        if !self.contains(name).await {
            return false;
        }

        let mut conn = match self.borrow(name).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::debug!(connection = %name, error = %e, "Liveness probe could not borrow");
                return false;
            }
        };

        match sqlx::query("SELECT 1").execute(&mut *conn).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(connection = %name, error = %e, "Liveness probe failed");
                false
            }
        }
    }

    /// Whether an entry exists, without probing it.
    pub async fn contains(&self, name: &str) -> bool {
        self.entries.read().await.contains_key(name)
    }

    /// Snapshot of the metadata of every registered connection.
    pub async fn list_connections(&self) -> BTreeMap<String, ConnectionInfo> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), entry.info.clone()))
            .collect()
    }

    /// Occupancy of the pool registered under `name`.
    pub async fn pool_status(&self, name: &str) -> Option<PoolStatus> {
        let entries = self.entries.read().await;
        entries.get(name).map(|entry| PoolStatus {
            size: entry.pool.size(),
            idle: entry.pool.num_idle(),
            max_size: entry.info.max_size,
            checked_out: entry.counters.checked_out.load(Ordering::SeqCst),
            peak_checked_out: entry.counters.peak.load(Ordering::SeqCst),
            borrows: entry.counters.borrows.load(Ordering::SeqCst),
            releases: entry.counters.releases.load(Ordering::SeqCst),
        })
    }

    /// Close every pool and empty the registry.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, ConnectionEntry)> = {
            let mut entries = self.entries.write().await;
            entries.drain().collect()
        };

        for (name, entry) in drained {
            self.close_pool(&name, entry.pool).await;
        }
        tracing::info!("Connection registry shut down");
    }

    /// Close a pool that has already been removed from the map.
    ///
    /// The pool stops handing out connections immediately. Waiting for
    /// checked-out connections is bounded by the acquire timeout; any that
    /// come back later are closed on release.
    async fn close_pool(&self, name: &str, pool: PgPool) {
        if tokio::time::timeout(self.options.acquire_timeout, pool.close())
            .await
            .is_err()
        {
            tracing::warn!(
                connection = %name,
                "Pool closed with connections still checked out; they close on release"
            );
        }
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A physical connection checked out of a named pool.
///
/// Dereferences to [`PgConnection`], so it can be passed to `sqlx` as
/// `&mut *conn`. Dropping it returns the connection to its origin pool.
pub struct ScopedConnection {
    name: String,
    conn: PoolConnection<Postgres>,
    counters: Arc<BorrowCounters>,
    metrics: Arc<MetricsCollector>,
}

impl ScopedConnection {
    fn new(
        name: String,
        conn: PoolConnection<Postgres>,
        counters: Arc<BorrowCounters>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let now = counters.checked_out.fetch_add(1, Ordering::SeqCst) + 1;
        counters.peak.fetch_max(now, Ordering::SeqCst);
        counters.borrows.fetch_add(1, Ordering::SeqCst);
        metrics.record_borrow();
        tracing::trace!(connection = %name, checked_out = now, "Borrowed connection");

        Self {
            name,
            conn,
            counters,
            metrics,
        }
    }

    /// Name of the pool this connection belongs to.
    pub fn connection_name(&self) -> &str {
        &self.name
    }
}

impl Deref for ScopedConnection {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        // The PoolConnection field is dropped right after this, which hands
        // the physical connection back to its own pool.
        let left = self.counters.checked_out.fetch_sub(1, Ordering::SeqCst) - 1;
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        self.metrics.record_release();
        tracing::trace!(connection = %self.name, checked_out = left, "Released connection");
    }
}

impl fmt::Debug for ScopedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConnection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
