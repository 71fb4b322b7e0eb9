//! Tool registry for MCP tools.
//!
//! The registry holds the definitions advertised by `tools/list` and checks
//! call arguments against each tool's input schema before a call is parsed
//! into a typed request.

use crate::error::ToolError;
use crate::protocol::{ToolAnnotations, ToolDefinition};
use serde_json::{Value, json};
use std::collections::HashMap;

/// Tool names understood by the server.
pub mod names {
    pub const CONNECT: &str = "connect";
    /// Older clients call `connect` by this name.
    pub const CONNECT_ALIAS: &str = "connect_database";
    pub const DISCONNECT: &str = "disconnect";
    pub const LIST_CONNECTIONS: &str = "list_connections";
    pub const EXPLORE_TABLES: &str = "explore_tables";
    pub const DESCRIBE_TABLE: &str = "describe_table";
    pub const SAMPLE_DATA: &str = "sample_data";
    pub const ANALYZE_DATA: &str = "analyze_data";
    pub const EXECUTE_QUERY: &str = "execute_query";
    pub const FIND_CORRELATIONS: &str = "find_correlations";
    pub const DETECT_ANOMALIES: &str = "detect_anomalies";
    pub const TIME_SERIES_ANALYSIS: &str = "time_series_analysis";
    pub const SERVER_METRICS: &str = "server_metrics";
}

/// Registry of available MCP tools.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every built-in tool.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for tool in catalog() {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name, resolving the `connect` alias.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        let name = if name == names::CONNECT_ALIAS {
            names::CONNECT
        } else {
            name
        };
        self.tools.get(name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// List all tools, ordered by name.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check `arguments` against the input schema of tool `name`.
    ///
    /// All schema violations are collected into a single message.
    pub fn validate_arguments(&self, name: &str, arguments: &Value) -> Result<(), ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let empty = json!({});
        let arguments = if arguments.is_null() { &empty } else { arguments };

        let validator = jsonschema::validator_for(&tool.input_schema).map_err(|e| {
            ToolError::InvalidArguments {
                tool: tool.name.clone(),
                reason: format!("invalid input schema: {}", e),
            }
        })?;

        let problems: Vec<String> = validator
            .iter_errors(arguments)
            .map(|error| {
                let path = error.instance_path().to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{}: {}", path, error)
                }
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ToolError::InvalidArguments {
                tool: tool.name.clone(),
                reason: problems.join("; "),
            })
        }
    }
}

fn string_prop(description: &str) -> Value {
    json!({"type": "string", "minLength": 1, "description": description})
}

fn connection_prop() -> Value {
    string_prop("Name of a connection created with `connect`")
}

fn table_prop() -> Value {
    string_prop("Table name (letters, digits and underscores)")
}

/// Row limit; values above the server's row cap are clamped, not rejected.
fn limit_prop(default: u64) -> Value {
    json!({"type": "integer", "minimum": 0, "maximum": u64::MAX, "default": default})
}

fn tool(
    name: &str,
    description: &str,
    properties: Value,
    required: &[&str],
    read_only: bool,
) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
        annotations: Some(ToolAnnotations {
            read_only: Some(read_only),
            open_world: Some(false),
        }),
    }
}

/// Definitions of every built-in tool.
pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        tool(
            names::CONNECT,
            "Connect to a PostgreSQL database and register it under a name",
            json!({
                "connection_name": string_prop("Name to register the connection under"),
                "host": string_prop("Database host"),
                "port": {"type": "integer", "minimum": 1, "maximum": 65535, "default": 5432},
                "database": string_prop("Database name"),
                "username": string_prop("Database user"),
                "password": {"type": "string", "description": "Database password"},
            }),
            &["connection_name", "host", "database", "username", "password"],
            false,
        ),
        tool(
            names::DISCONNECT,
            "Close a named connection and its pool",
            json!({"connection_name": connection_prop()}),
            &["connection_name"],
            false,
        ),
        tool(
            names::LIST_CONNECTIONS,
            "List registered connections",
            json!({}),
            &[],
            true,
        ),
        tool(
            names::EXPLORE_TABLES,
            "List tables and views of the public schema",
            json!({"connection_name": connection_prop()}),
            &["connection_name"],
            true,
        ),
        tool(
            names::DESCRIBE_TABLE,
            "Show the columns of a table",
            json!({"connection_name": connection_prop(), "table_name": table_prop()}),
            &["connection_name", "table_name"],
            true,
        ),
        tool(
            names::SAMPLE_DATA,
            "Show the first rows of a table",
            json!({
                "connection_name": connection_prop(),
                "table_name": table_prop(),
                "limit": limit_prop(10),
            }),
            &["connection_name", "table_name"],
            true,
        ),
        tool(
            names::ANALYZE_DATA,
            "Count the rows and columns of a table",
            json!({"connection_name": connection_prop(), "table_name": table_prop()}),
            &["connection_name", "table_name"],
            true,
        ),
        tool(
            names::EXECUTE_QUERY,
            "Run a single read-only SELECT query",
            json!({
                "connection_name": connection_prop(),
                "query": string_prop("SELECT statement"),
                "limit": limit_prop(100),
            }),
            &["connection_name", "query"],
            true,
        ),
        tool(
            names::FIND_CORRELATIONS,
            "Report strongly correlated numeric column pairs of a table",
            json!({"connection_name": connection_prop(), "table_name": table_prop()}),
            &["connection_name", "table_name"],
            true,
        ),
        tool(
            names::DETECT_ANOMALIES,
            "Count Z-score outliers in a numeric column",
            json!({
                "connection_name": connection_prop(),
                "table_name": table_prop(),
                "column_name": string_prop("Numeric column"),
            }),
            &["connection_name", "table_name", "column_name"],
            true,
        ),
        tool(
            names::TIME_SERIES_ANALYSIS,
            "Summarize the trend of a value column ordered by a date column",
            json!({
                "connection_name": connection_prop(),
                "table_name": table_prop(),
                "date_column": string_prop("Column to order by"),
                "value_column": string_prop("Numeric column to summarize"),
            }),
            &["connection_name", "table_name", "date_column", "value_column"],
            true,
        ),
        tool(
            names::SERVER_METRICS,
            "Show query, connection and error counters",
            json!({}),
            &[],
            true,
        ),
    ]
}
