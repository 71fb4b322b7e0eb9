//! In-process counters for queries, connections and pool borrows.
//!
//! Counters live for the lifetime of the process and are never persisted.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free metrics shared by the registry and the tool layer.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    queries_executed: AtomicU64,
    query_time_micros: AtomicU64,
    connections_created: AtomicU64,
    errors: AtomicU64,
    borrows: AtomicU64,
    releases: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub connections_created: u64,
    pub errors: u64,
    /// Mean duration of recorded operations, in seconds.
    pub avg_query_time: f64,
    pub borrows: u64,
    pub releases: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed operation and its duration.
    pub fn record_query(&self, duration: Duration) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
        self.query_time_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_connection(&self) {
        self.connections_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_borrow(&self) {
        self.borrows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let queries = self.queries_executed.load(Ordering::Relaxed);
        let micros = self.query_time_micros.load(Ordering::Relaxed);
        let avg_query_time = if queries == 0 {
            0.0
        } else {
            micros as f64 / queries as f64 / 1_000_000.0
        };

        MetricsSnapshot {
            queries_executed: queries,
            connections_created: self.connections_created.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            avg_query_time,
            borrows: self.borrows.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}
