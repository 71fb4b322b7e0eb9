//! MCP server implementation.
//!
//! This module provides the JSON-RPC front of the tool executor and the two
//! transports it can run on: newline-delimited stdio and HTTP.

use crate::error::McpError;
use crate::executor::ToolExecutor;
use crate::http_transport::HttpServer;
use crate::protocol::*;
use serde_json::{Value, json};
use sqlmagic_adapter_pg::PoolRegistry;
use sqlmagic_core::{McpConfig, SqlMagicConfig, Transport};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Name reported in `initialize` and `/health`.
pub const SERVER_NAME: &str = "sqlmagic";

const RESPONSE_BUFFER: usize = 64;

/// The MCP server.
pub struct McpServer {
    config: McpConfig,
    executor: ToolExecutor,
}

impl McpServer {
    /// Create a server over `registry` using the settings in `config`.
    pub fn new(config: Arc<SqlMagicConfig>, registry: Arc<PoolRegistry>) -> Self {
        Self {
            config: config.mcp.clone(),
            executor: ToolExecutor::new(registry, config),
        }
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Start the MCP server on the configured transport.
    ///
    /// Every pool is closed before this returns.
    pub async fn run(self: Arc<Self>) -> Result<(), McpError> {
        let result = match self.config.transport {
            Transport::Stdio => self.clone().run_stdio().await,
            Transport::Http => self.clone().run_http().await,
        };
        self.executor.registry().shutdown().await;
        result
    }

    /// Run the server with stdio transport.
    ///
    /// Reads one request per line until EOF. Nothing but responses is ever
    /// written to stdout.
    async fn run_stdio(self: Arc<Self>) -> Result<(), McpError> {
        tracing::info!("Starting MCP server with stdio transport");
        self.serve_lines(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await?;
        tracing::info!("stdin closed, stopping MCP server");
        Ok(())
    }

    /// Serve newline-delimited JSON-RPC from `reader` to `writer`.
    ///
    /// Each request runs on its own task; responses are written in
    /// completion order by a single writer task.
    async fn serve_lines<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (response_tx, response_rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_BUFFER);
        let writer = tokio::spawn(write_responses(response_rx, writer));

        let mut lines = reader.lines();
        let mut in_flight = JoinSet::new();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) => {
                    let server = Arc::clone(&self);
                    let response_tx = response_tx.clone();
                    in_flight.spawn(async move {
                        if let Some(response) = server.handle_request(request).await {
                            // The writer only stops early on a broken stdout.
                            let _ = response_tx.send(response).await;
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Unparsable JSON-RPC message");
                    let response = JsonRpcResponse::error(
                        None,
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    );
                    if response_tx.send(response).await.is_err() {
                        break;
                    }
                }
            }

            while in_flight.try_join_next().is_some() {}
        }

        while in_flight.join_next().await.is_some() {}
        drop(response_tx);

        writer
            .await
            .map_err(|e| McpError::TransportError(format!("response writer failed: {}", e)))?
    }

    /// Run the server with HTTP transport until Ctrl-C.
    pub async fn run_http(self: Arc<Self>) -> Result<(), McpError> {
        let address = self.config.bind_address();
        tracing::info!(address = %address, "Starting MCP server with HTTP transport");
        HttpServer::new(address, self).run().await
    }

    /// Handle a JSON-RPC request.
    ///
    /// Returns `None` for notifications, which get no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        let notification = request.is_notification();

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" => {
                tracing::debug!("Client initialized");
                JsonRpcResponse::success(id, json!({}))
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id).await,
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        if notification {
            None
        } else {
            Some(response)
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let response = ListToolsResponse {
            tools: self.executor.tools().list().into_iter().cloned().collect(),
        };
        match serde_json::to_value(response) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                );
            }
            None => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing params");
            }
        };

        tracing::info!(tool = %params.name, "Tool call");
        let result = self
            .executor
            .execute(&params.name, params.arguments)
            .await
            .into_response();

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        self.executor.registry().shutdown().await;
        JsonRpcResponse::success(id, json!(null))
    }
}

async fn write_responses<W>(
    mut responses: mpsc::Receiver<JsonRpcResponse>,
    mut writer: W,
) -> Result<(), McpError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = responses.recv().await {
        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
    }
    Ok(())
}
