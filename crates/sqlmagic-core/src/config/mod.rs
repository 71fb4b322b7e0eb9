//! Configuration types for SQLMagic.
//!
//! Configuration is resolved from three layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. An optional YAML file (`sqlmagic.yaml`)
//! 3. Environment variables
//!
//! Command-line flags are applied on top of the result by the CLI.
//!
//! # Environment Variables
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `LOG_LEVEL` | `log_level` | `INFO` |
//! | `MAX_CONNECTIONS` | `max_connections` | `10` |
//! | `QUERY_TIMEOUT` | `query_timeout` | `30` |
//! | `MAX_ROWS_LIMIT` | `max_rows_limit` | `10000` |
//! | `CHART_WIDTH` | `chart_width` | `10` |
//! | `CHART_HEIGHT` | `chart_height` | `6` |

pub mod mcp;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub use mcp::{McpConfig, Transport};

/// Complete SQLMagic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlMagicConfig {
    /// Log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum pooled connections per named connection.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds allowed for acquiring a pooled connection and for the
    /// database work of a single tool call.
    #[serde(default = "default_query_timeout")]
    pub query_timeout: u64,

    /// Upper bound on rows fetched by any single query.
    #[serde(default = "default_max_rows_limit")]
    pub max_rows_limit: u32,

    /// Chart width in inches. Reserved for chart rendering.
    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    /// Chart height in inches. Reserved for chart rendering.
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    /// MCP server configuration.
    #[serde(default)]
    pub mcp: McpConfig,
}

impl Default for SqlMagicConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_connections: default_max_connections(),
            query_timeout: default_query_timeout(),
            max_rows_limit: default_max_rows_limit(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            mcp: McpConfig::default(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_query_timeout() -> u64 {
    30
}

fn default_max_rows_limit() -> u32 {
    10000
}

fn default_chart_width() -> u32 {
    10
}

fn default_chart_height() -> u32 {
    6
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqlMagicConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Resolve the full configuration: defaults, then the optional file,
    /// then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style variables.
    ///
    /// `lookup` returns the raw value of a variable, or `None` when it is
    /// unset. Values that fail to parse are reported, not ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(v) = parse_var(&lookup, "MAX_CONNECTIONS")? {
            self.max_connections = v;
        }
        if let Some(v) = parse_var(&lookup, "QUERY_TIMEOUT")? {
            self.query_timeout = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_ROWS_LIMIT")? {
            self.max_rows_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "CHART_WIDTH")? {
            self.chart_width = v;
        }
        if let Some(v) = parse_var(&lookup, "CHART_HEIGHT")? {
            self.chart_height = v;
        }
        Ok(())
    }

    /// Reject values no pool or query could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.max_rows_limit == 0 {
            return Err(ConfigError::Config(
                "max_rows_limit must be at least 1".to_string(),
            ));
        }
        if self.query_timeout == 0 {
            return Err(ConfigError::Config(
                "query_timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// The query timeout as a `Duration`.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Translate `log_level` into a `tracing` filter directive.
    ///
    /// Accepts Python-style names (`WARNING`, `CRITICAL`) as well as the
    /// usual `tracing` levels.
    pub fn tracing_directive(&self) -> &'static str {
        match self.log_level.to_ascii_uppercase().as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "WARN" | "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}
