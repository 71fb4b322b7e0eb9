//! Typed tool requests.
//!
//! A `tools/call` carries a tool name and an untyped argument object. This
//! module turns that pair into one [`ToolRequest`] variant with its own
//! argument struct, so the executor dispatches with an exhaustive `match`.

use crate::error::ToolError;
use crate::tools::names;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Arguments of `connect`.
#[derive(Clone, Deserialize)]
pub struct ConnectArgs {
    pub connection_name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

// Manual impl keeps the password out of logs.
impl fmt::Debug for ConnectArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectArgs")
            .field("connection_name", &self.connection_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Arguments naming only a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionArgs {
    pub connection_name: String,
}

/// Arguments naming a connection and a table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableArgs {
    pub connection_name: String,
    pub table_name: String,
}

/// Arguments of `sample_data`.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleArgs {
    pub connection_name: String,
    pub table_name: String,
    #[serde(default = "default_sample_limit")]
    pub limit: u64,
}

/// Arguments of `execute_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryArgs {
    pub connection_name: String,
    pub query: String,
    #[serde(default = "default_query_limit")]
    pub limit: u64,
}

/// Arguments of `detect_anomalies`.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnArgs {
    pub connection_name: String,
    pub table_name: String,
    pub column_name: String,
}

/// Arguments of `time_series_analysis`.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesArgs {
    pub connection_name: String,
    pub table_name: String,
    pub date_column: String,
    pub value_column: String,
}

fn default_port() -> u16 {
    5432
}

fn default_sample_limit() -> u64 {
    10
}

fn default_query_limit() -> u64 {
    100
}

/// One fully-typed tool invocation.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    Connect(ConnectArgs),
    Disconnect(ConnectionArgs),
    ListConnections,
    ExploreTables(ConnectionArgs),
    DescribeTable(TableArgs),
    SampleData(SampleArgs),
    AnalyzeData(TableArgs),
    ExecuteQuery(QueryArgs),
    FindCorrelations(TableArgs),
    DetectAnomalies(ColumnArgs),
    TimeSeriesAnalysis(TimeSeriesArgs),
    ServerMetrics,
}

impl ToolRequest {
    /// Build a request from a tool name and its raw arguments.
    ///
    /// `null` arguments are treated as an empty object.
    pub fn parse(name: &str, arguments: Value) -> Result<Self, ToolError> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let request = match name {
            names::CONNECT | names::CONNECT_ALIAS => {
                ToolRequest::Connect(decode(name, arguments)?)
            }
            names::DISCONNECT => ToolRequest::Disconnect(decode(name, arguments)?),
            names::LIST_CONNECTIONS => ToolRequest::ListConnections,
            names::EXPLORE_TABLES => ToolRequest::ExploreTables(decode(name, arguments)?),
            names::DESCRIBE_TABLE => ToolRequest::DescribeTable(decode(name, arguments)?),
            names::SAMPLE_DATA => ToolRequest::SampleData(decode(name, arguments)?),
            names::ANALYZE_DATA => ToolRequest::AnalyzeData(decode(name, arguments)?),
            names::EXECUTE_QUERY => ToolRequest::ExecuteQuery(decode(name, arguments)?),
            names::FIND_CORRELATIONS => ToolRequest::FindCorrelations(decode(name, arguments)?),
            names::DETECT_ANOMALIES => ToolRequest::DetectAnomalies(decode(name, arguments)?),
            names::TIME_SERIES_ANALYSIS => {
                ToolRequest::TimeSeriesAnalysis(decode(name, arguments)?)
            }
            names::SERVER_METRICS => ToolRequest::ServerMetrics,
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        Ok(request)
    }

    /// Canonical tool name of this request.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRequest::Connect(_) => names::CONNECT,
            ToolRequest::Disconnect(_) => names::DISCONNECT,
            ToolRequest::ListConnections => names::LIST_CONNECTIONS,
            ToolRequest::ExploreTables(_) => names::EXPLORE_TABLES,
            ToolRequest::DescribeTable(_) => names::DESCRIBE_TABLE,
            ToolRequest::SampleData(_) => names::SAMPLE_DATA,
            ToolRequest::AnalyzeData(_) => names::ANALYZE_DATA,
            ToolRequest::ExecuteQuery(_) => names::EXECUTE_QUERY,
            ToolRequest::FindCorrelations(_) => names::FIND_CORRELATIONS,
            ToolRequest::DetectAnomalies(_) => names::DETECT_ANOMALIES,
            ToolRequest::TimeSeriesAnalysis(_) => names::TIME_SERIES_ANALYSIS,
            ToolRequest::ServerMetrics => names::SERVER_METRICS,
        }
    }

    /// Logical connection the request targets, if any.
    pub fn connection_name(&self) -> Option<&str> {
        match self {
            ToolRequest::Connect(a) => Some(&a.connection_name),
            ToolRequest::Disconnect(a) | ToolRequest::ExploreTables(a) => Some(&a.connection_name),
            ToolRequest::DescribeTable(a)
            | ToolRequest::AnalyzeData(a)
            | ToolRequest::FindCorrelations(a) => Some(&a.connection_name),
            ToolRequest::SampleData(a) => Some(&a.connection_name),
            ToolRequest::ExecuteQuery(a) => Some(&a.connection_name),
            ToolRequest::DetectAnomalies(a) => Some(&a.connection_name),
            ToolRequest::TimeSeriesAnalysis(a) => Some(&a.connection_name),
            ToolRequest::ListConnections | ToolRequest::ServerMetrics => None,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}
