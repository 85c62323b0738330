//! Gmail API type definitions
//!
//! These types mirror the Gmail API responses consumed by the client, plus
//! the simplified records returned to tool callers. Remote shapes are parsed
//! into these structs; anything that doesn't fit surfaces as a
//! `GmailApiError` rather than a raw lookup fault.

use serde::{Deserialize, Serialize};

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// MIME type of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Headers for this part
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Body of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

/// Header in a message part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    /// Header name
    pub name: String,

    /// Header value
    pub value: String,
}

/// Body of a message part
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A Gmail message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Label IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,

    /// Snippet (preview text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Message payload (MIME structure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,
}

/// List of messages response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Messages in this page
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    /// Next page token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Result size estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u32>,
}

/// Reference to a message (id and thread id only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// A Gmail label
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Label ID
    pub id: String,

    /// Label name
    pub name: String,

    /// Label type (system or user)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,

    /// Total message count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_total: Option<i64>,

    /// Unread message count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages_unread: Option<i64>,

    /// Total thread count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_total: Option<i64>,

    /// Unread thread count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_unread: Option<i64>,
}

/// List of labels response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelList {
    /// Labels
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Request to modify message labels
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModifyMessageRequest {
    /// Label IDs to add
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_label_ids: Option<Vec<String>>,

    /// Label IDs to remove
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_label_ids: Option<Vec<String>>,
}

/// Simplified email record returned by the list and search tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSummary {
    /// Message ID
    pub id: String,

    /// Thread ID
    pub thread_id: String,

    /// Sender (From header)
    #[serde(rename = "from")]
    pub sender: String,

    /// Recipient (To header)
    pub to: String,

    /// Subject header
    pub subject: String,

    /// Date header, normalized to `YYYY-MM-DD HH:MM` when parseable
    pub date: String,

    /// Snippet (provider-generated preview)
    pub snippet: String,

    /// Label IDs on the message
    pub labels: Vec<String>,

    /// Body text truncated to a preview
    pub body_preview: String,
}

/// Simplified label record returned by the labels tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSummary {
    /// Label ID
    pub id: String,

    /// Display name
    pub name: String,

    /// "system" or "user"
    #[serde(rename = "type")]
    pub label_type: String,

    /// Total message count
    pub messages_total: Option<i64>,

    /// Unread message count
    pub messages_unread: Option<i64>,

    /// Total thread count
    pub threads_total: Option<i64>,

    /// Unread thread count
    pub threads_unread: Option<i64>,
}

/// Per-item failure detail in a bulk operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    /// Message ID that failed
    pub id: String,

    /// Failure reason
    pub error: String,
}

/// Result of a bulk label-modification operation.
///
/// One failed item never aborts its siblings; both sides are reported.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BulkResult {
    /// IDs that were modified successfully, in request order
    pub succeeded: Vec<String>,

    /// Per-item failures, in request order
    pub failed: Vec<BulkFailure>,
}
