//! # sqlmagic-adapter-pg
//!
//! Postgres access for SQLMagic.
//!
//! The centre of this crate is [`PoolRegistry`]: a map from caller-chosen
//! connection names to bounded `sqlx` pools. Every database access goes
//! through [`PoolRegistry::borrow`], which hands out a [`ScopedConnection`]
//! that returns itself to its pool when dropped, on every exit path.
//!
//! ```ignore
//! use sqlmagic_adapter_pg::{ConnectParams, PoolRegistry, RegistryOptions};
//!
//! let registry = PoolRegistry::new(RegistryOptions::default());
//! registry.connect(ConnectParams::new("main", "localhost", "shop", "app", "secret")).await?;
//!
//! let mut conn = registry.borrow("main").await?;
//! let tables = sqlmagic_adapter_pg::introspect::list_tables(&mut conn).await?;
//! // `conn` goes back to the "main" pool here.
//! ```

pub mod error;
pub mod introspect;
pub mod metrics;
pub mod registry;
pub mod rows;

pub use error::PoolError;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use registry::{
    ConnectParams, ConnectionInfo, PoolRegistry, PoolStatus, RegistryOptions, ScopedConnection,
};
pub use rows::QueryTable;
