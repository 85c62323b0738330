//! MCP server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.
//! Requests arrive one per line on stdin; responses go to stdout.
//! Everything else (logs, prompts) goes to stderr.

use std::io::{BufRead, Write};
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::gmail::client::GmailClient;
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

/// MCP server info
const SERVER_NAME: &str = "gmail";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP method names
mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const PING: &str = "ping";
}

/// MCP server for Gmail
pub struct McpServer {
    /// Tool handler
    tool_handler: ToolHandler,
}

impl McpServer {
    /// Create a new MCP server around a shared Gmail client
    pub fn new(gmail_client: Arc<GmailClient>) -> Self {
        Self {
            tool_handler: ToolHandler::new(gmail_client),
        }
    }

    /// Run the server on stdio until stdin closes
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line).await {
                let response_str = serde_json::to_string(&response)?;
                writeln!(stdout, "{}", response_str)?;
                stdout.flush()?;
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one JSON-RPC message; `None` means no response (notification)
    async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    RequestId::Number(0),
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        match request.method.as_str() {
            methods::INITIALIZE => {
                Some(JsonRpcResponse::success(request.id, self.initialize_result()))
            }
            methods::INITIALIZED => {
                tracing::debug!("client initialized");
                None
            }
            methods::PING => Some(JsonRpcResponse::success(
                request.id,
                serde_json::json!({}),
            )),
            methods::LIST_TOOLS => {
                let result = ListToolsResult {
                    tools: self.tool_handler.list_tools(),
                };
                Some(JsonRpcResponse::success(
                    request.id,
                    serde_json::to_value(result).unwrap_or(Value::Null),
                ))
            }
            methods::CALL_TOOL => {
                let result = self.handle_call_tool(&request).await;
                Some(JsonRpcResponse::success(request.id, result))
            }
            other => Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::method_not_found(other),
            )),
        }
    }

    fn initialize_result(&self) -> Value {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
        };

        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    /// Handle a tool call. Failures become structured payloads, never a
    /// dropped connection.
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> Value {
        let params: CallToolParams = match request.params.as_ref() {
            Some(p) => match serde_json::from_value(p.clone()) {
                Ok(params) => params,
                Err(e) => {
                    return to_value_or_failure(CallToolResult::failure(
                        "validation_error",
                        format!("Invalid tool parameters: {}", e),
                    ));
                }
            },
            None => {
                return to_value_or_failure(CallToolResult::failure(
                    "validation_error",
                    "Missing tool parameters",
                ));
            }
        };

        let result = self
            .tool_handler
            .call_tool(&params.name, params.arguments)
            .await;
        to_value_or_failure(result)
    }
}

fn to_value_or_failure(result: CallToolResult) -> Value {
    serde_json::to_value(result).unwrap_or_else(|e| {
        serde_json::json!({
            "content": [{"type": "text", "text": format!("Error: {}", e)}],
            "isError": true,
        })
    })
}
