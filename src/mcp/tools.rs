//! MCP tool definitions and handlers
//!
//! Registers the five Gmail tools, validates their arguments, delegates to
//! the Gmail client, and converts every error into a structured failure
//! payload. A tool call never takes down the protocol connection.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::GmailMcpError;
use crate::gmail::client::GmailClient;
use crate::gmail::types::BulkResult;
use crate::mcp::types::{CallToolResult, Tool};

/// Tool handler holding the process-wide Gmail client
pub struct ToolHandler {
    gmail_client: Arc<GmailClient>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(gmail_client: Arc<GmailClient>) -> Self {
        Self { gmail_client }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                "list_unread",
                "List unread emails from the inbox",
                list_unread_schema(),
            ),
            tool_def(
                "search",
                "Search emails using Gmail query syntax",
                search_schema(),
            ),
            tool_def(
                "archive",
                "Archive emails by removing the INBOX and UNREAD labels",
                message_ids_schema("List of message IDs to archive"),
            ),
            tool_def(
                "mark_as_read",
                "Mark emails as read without archiving",
                message_ids_schema("List of message IDs to mark as read"),
            ),
            tool_def(
                "get_labels",
                "Get all Gmail labels for the authenticated user",
                json!({"type": "object", "properties": {}}),
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        match name {
            "list_unread" => self.handle_list_unread(args).await,
            "search" => self.handle_search(args).await,
            "archive" => self.handle_archive(args).await,
            "mark_as_read" => self.handle_mark_as_read(args).await,
            "get_labels" => self.handle_get_labels().await,
            _ => CallToolResult::failure("unknown_tool", format!("Unknown tool: {}", name)),
        }
    }

    async fn handle_list_unread(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        struct Args {
            max_results: Option<u32>,
        }

        let args: Args = match parse_args(args) {
            Ok(a) => a,
            Err(result) => return result,
        };

        match self.gmail_client.list_unread(args.max_results).await {
            Ok(summaries) => CallToolResult::json(&summaries),
            Err(e) => failure_from(e),
        }
    }

    async fn handle_search(&self, args: Value) -> CallToolResult {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            max_results: Option<u32>,
        }

        let args: Args = match parse_args(args) {
            Ok(a) => a,
            Err(result) => return result,
        };

        match self.gmail_client.search(&args.query, args.max_results).await {
            Ok(summaries) => CallToolResult::json(&summaries),
            Err(e) => failure_from(e),
        }
    }

    async fn handle_archive(&self, args: Value) -> CallToolResult {
        let message_ids = match parse_message_ids(args) {
            Ok(ids) => ids,
            Err(result) => return result,
        };

        match self.gmail_client.archive(&message_ids).await {
            Ok(result) => CallToolResult::json(&bulk_report(&result, "archived")),
            Err(e) => failure_from(e),
        }
    }

    async fn handle_mark_as_read(&self, args: Value) -> CallToolResult {
        let message_ids = match parse_message_ids(args) {
            Ok(ids) => ids,
            Err(result) => return result,
        };

        match self.gmail_client.mark_as_read(&message_ids).await {
            Ok(result) => CallToolResult::json(&bulk_report(&result, "marked")),
            Err(e) => failure_from(e),
        }
    }

    async fn handle_get_labels(&self) -> CallToolResult {
        match self.gmail_client.get_labels().await {
            Ok(labels) => CallToolResult::json(&labels),
            Err(e) => failure_from(e),
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, CallToolResult> {
    // Clients may omit "arguments" entirely, which parses as null
    let args = if args.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        args
    };

    serde_json::from_value(args).map_err(|e| {
        CallToolResult::failure("validation_error", format!("Invalid arguments: {}", e))
    })
}

fn parse_message_ids(args: Value) -> Result<Vec<String>, CallToolResult> {
    #[derive(Deserialize)]
    struct Args {
        message_ids: Vec<String>,
    }

    parse_args::<Args>(args).map(|a| a.message_ids)
}

fn failure_from(e: GmailMcpError) -> CallToolResult {
    CallToolResult::failure(e.kind(), e.to_string())
}

/// Shape a bulk result the way callers expect: counts plus per-id detail
fn bulk_report(result: &BulkResult, verb: &str) -> Value {
    let mut details = serde_json::Map::new();
    details.insert(verb.to_string(), json!(result.succeeded));
    details.insert("failed".to_string(), json!(result.failed));

    let mut report = serde_json::Map::new();
    report.insert(format!("{}_count", verb), json!(result.succeeded.len()));
    report.insert("failed_count".to_string(), json!(result.failed.len()));
    report.insert("details".to_string(), Value::Object(details));
    Value::Object(report)
}

// ==================== Schema definitions ====================

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

fn list_unread_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "max_results": {
                "type": "integer",
                "minimum": 1,
                "maximum": 100,
                "default": 20,
                "description": "Maximum number of emails to return (1-100)"
            }
        }
    })
}

fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "Gmail search query (e.g. \"from:user@example.com is:unread\", \"newer_than:1d\")"
            },
            "max_results": {
                "type": "integer",
                "minimum": 1,
                "maximum": 100,
                "default": 20,
                "description": "Maximum number of results (1-100)"
            }
        },
        "required": ["query"]
    })
}

fn message_ids_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "message_ids": {
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "description": description
            }
        },
        "required": ["message_ids"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::ToolResultContent;

    #[test]
    fn test_bulk_report_shape() {
        let result = BulkResult {
            succeeded: vec!["m1".to_string(), "m2".to_string()],
            failed: vec![crate::gmail::types::BulkFailure {
                id: "m3".to_string(),
                error: "message not found: m3".to_string(),
            }],
        };

        let report = bulk_report(&result, "archived");
        assert_eq!(report["archived_count"], 2);
        assert_eq!(report["failed_count"], 1);
        assert_eq!(report["details"]["archived"][0], "m1");
        assert_eq!(report["details"]["failed"][0]["id"], "m3");
    }

    #[test]
    fn test_parse_message_ids_rejects_wrong_type() {
        let result = parse_message_ids(json!({"message_ids": "not-a-list"}));
        let failure = result.unwrap_err();
        assert!(failure.is_error);
        let ToolResultContent::Text { text } = &failure.content[0];
        assert!(text.contains("validation_error"));
    }
}
