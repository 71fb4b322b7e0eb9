//! # sqlmagic-core
//!
//! Types shared by every SQLMagic crate:
//!
//! - [`config`]: process configuration (defaults, YAML file, environment)
//! - [`validate`]: identifier grammar and read-only query checks applied
//!   before any text is interpolated into SQL

pub mod config;
pub mod validate;

pub use config::{ConfigError, McpConfig, SqlMagicConfig, Transport};
pub use validate::{
    ValidationError, ensure_single_select, is_safe_query, sanitize_identifier, validate_identifier,
};
