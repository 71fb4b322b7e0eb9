//! Tool execution engine.
//!
//! This module handles the execution of MCP tool calls:
//! - Checking arguments against the tool's input schema
//! - Parsing them into a typed [`ToolRequest`]
//! - Running the routine under the configured query timeout
//! - Recording timing and errors in the metrics collector
//!
//! It is the only place where errors become client-visible text.

use crate::analytics;
use crate::basic;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::protocol::{CallToolResponse, ToolContent};
use crate::request::ToolRequest;
use crate::tools::ToolRegistry;
use serde_json::Value;
use sqlmagic_adapter_pg::{MetricsCollector, PoolError, PoolRegistry};
use sqlmagic_core::SqlMagicConfig;
use std::sync::Arc;
use std::time::Instant;

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Whether the execution was successful.
    pub success: bool,
    /// Text shown to the client.
    pub text: String,
}

impl ExecutionResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
        }
    }

    pub fn into_response(self) -> CallToolResponse {
        CallToolResponse {
            content: vec![ToolContent::Text { text: self.text }],
            is_error: Some(!self.success),
        }
    }
}

/// The tool executor runs tools against the pool registry.
pub struct ToolExecutor {
    ctx: ToolContext,
    tools: ToolRegistry,
}

impl ToolExecutor {
    pub fn new(registry: Arc<PoolRegistry>, config: Arc<SqlMagicConfig>) -> Self {
        Self {
            ctx: ToolContext::new(registry, config),
            tools: ToolRegistry::builtin(),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.ctx.registry
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        self.ctx.registry.metrics()
    }

    /// Run tool `name` with raw `arguments`.
    ///
    /// Never fails: every error is rendered into an error result.
    pub async fn execute(&self, name: &str, arguments: Value) -> ExecutionResult {
        let started = Instant::now();
        let outcome = self.run(name, arguments).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(text) => {
                self.metrics().record_query(elapsed);
                tracing::debug!(tool = %name, elapsed_ms = elapsed.as_millis() as u64, "Tool call completed");
                ExecutionResult::success(text)
            }
            Err(e) => {
                self.metrics().record_error();
                tracing::error!(tool = %name, kind = e.kind(), error = %e, "Tool call failed");
                ExecutionResult::error(e.to_text())
            }
        }
    }

    async fn run(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        self.tools.validate_arguments(name, &arguments)?;
        let request = ToolRequest::parse(name, arguments)?;
        tracing::debug!(
            tool = request.tool_name(),
            connection = request.connection_name().unwrap_or("-"),
            "Dispatching tool call"
        );

        let timeout = self.ctx.config.query_timeout_duration();
        match tokio::time::timeout(timeout, self.dispatch(request)).await {
            Ok(result) => result,
            Err(_) => Err(PoolError::Timeout(timeout).into()),
        }
    }

    async fn dispatch(&self, request: ToolRequest) -> Result<String, ToolError> {
        let ctx = &self.ctx;
        match request {
            ToolRequest::Connect(args) => basic::connect(ctx, args).await,
            ToolRequest::Disconnect(args) => basic::disconnect(ctx, args).await,
            ToolRequest::ListConnections => basic::list_connections(ctx).await,
            ToolRequest::ExploreTables(args) => basic::explore_tables(ctx, args).await,
            ToolRequest::DescribeTable(args) => basic::describe_table(ctx, args).await,
            ToolRequest::SampleData(args) => basic::sample_data(ctx, args).await,
            ToolRequest::AnalyzeData(args) => basic::analyze_data(ctx, args).await,
            ToolRequest::ExecuteQuery(args) => basic::execute_query(ctx, args).await,
            ToolRequest::FindCorrelations(args) => analytics::find_correlations(ctx, args).await,
            ToolRequest::DetectAnomalies(args) => analytics::detect_anomalies(ctx, args).await,
            ToolRequest::TimeSeriesAnalysis(args) => {
                analytics::time_series_analysis(ctx, args).await
            }
            ToolRequest::ServerMetrics => basic::server_metrics(ctx),
        }
    }
}
