//! Gmail API client
//!
//! High-level client for the five remote operations. Inputs are validated
//! before any network call; per-item failures in bulk operations are
//! recorded instead of aborting the batch.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::gmail::{labels, API_BASE_URL, USER_ID};
use crate::error::{GmailApiError, Result, ValidationError};
use crate::gmail::auth::Authenticator;
use crate::gmail::types::{
    BulkFailure, BulkResult, EmailSummary, Label, LabelList, LabelSummary, Message, MessageList,
    ModifyMessageRequest,
};
use crate::gmail::utils::{extract_body_text, find_header, format_date, truncate_chars};

/// Default page size for list and search
const DEFAULT_MAX_RESULTS: u32 = 20;

/// Cap on the body preview carried in a summary
const BODY_PREVIEW_LIMIT: usize = 2000;

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth credential store
    authenticator: Arc<Authenticator>,

    /// API base URL (injectable for tests)
    base_url: String,
}

impl GmailClient {
    /// Create a new Gmail client against the production API
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self::with_base_url(authenticator, API_BASE_URL)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(authenticator: Arc<Authenticator>, base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            authenticator,
            base_url: base_url.into(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        self.authenticator.access_token().await
    }

    fn messages_url(&self) -> String {
        format!("{}/users/{}/messages", self.base_url, USER_ID)
    }

    fn labels_url(&self) -> String {
        format!("{}/users/{}/labels", self.base_url, USER_ID)
    }

    /// List unread inbox messages, most recent first (provider order)
    pub async fn list_unread(&self, max_results: Option<u32>) -> Result<Vec<EmailSummary>> {
        let max = validate_max_results(max_results)?;

        let url = format!(
            "{}?labelIds={}&labelIds={}&maxResults={}",
            self.messages_url(),
            labels::INBOX,
            labels::UNREAD,
            max
        );

        self.fetch_summaries(&url).await
    }

    /// Search messages with Gmail query syntax, provider order preserved
    pub async fn search(&self, query: &str, max_results: Option<u32>) -> Result<Vec<EmailSummary>> {
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        let max = validate_max_results(max_results)?;

        let url = format!(
            "{}?q={}&maxResults={}",
            self.messages_url(),
            urlencoding::encode(query),
            max
        );

        self.fetch_summaries(&url).await
    }

    /// Archive messages by removing the INBOX and UNREAD labels
    pub async fn archive(&self, message_ids: &[String]) -> Result<BulkResult> {
        self.bulk_remove_labels(message_ids, &[labels::INBOX, labels::UNREAD])
            .await
    }

    /// Mark messages as read by removing only the UNREAD label
    pub async fn mark_as_read(&self, message_ids: &[String]) -> Result<BulkResult> {
        self.bulk_remove_labels(message_ids, &[labels::UNREAD]).await
    }

    /// List all labels for the authenticated user
    pub async fn get_labels(&self) -> Result<Vec<LabelSummary>> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(self.labels_url())
            .bearer_auth(&token)
            .send()
            .await?;

        let label_list: LabelList = Self::read_response(response).await?;

        Ok(label_list.labels.into_iter().map(label_summary).collect())
    }

    /// Run a message list query and hydrate each hit into a summary
    async fn fetch_summaries(&self, url: &str) -> Result<Vec<EmailSummary>> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await?;

        let message_list: MessageList = Self::read_response(response).await?;

        let mut summaries = Vec::with_capacity(message_list.messages.len());
        for msg_ref in &message_list.messages {
            summaries.push(self.fetch_summary(&token, &msg_ref.id).await?);
        }

        Ok(summaries)
    }

    /// Fetch one message in full and reduce it to a summary
    async fn fetch_summary(&self, token: &str, message_id: &str) -> Result<EmailSummary> {
        let url = format!("{}/{}?format=full", self.messages_url(), message_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Err(GmailApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }
            .into());
        }

        let message: Message = Self::read_response(response).await?;

        let payload = message.payload.as_ref();
        let header = |name: &str| {
            payload
                .and_then(|p| find_header(p, name))
                .unwrap_or("")
                .to_string()
        };

        let body = payload.map(extract_body_text).unwrap_or_default();

        Ok(EmailSummary {
            id: message.id,
            thread_id: message.thread_id.unwrap_or_default(),
            sender: header("From"),
            to: header("To"),
            subject: header("Subject"),
            date: format_date(&header("Date")),
            snippet: message.snippet.unwrap_or_default(),
            labels: message.label_ids,
            body_preview: truncate_chars(&body, BODY_PREVIEW_LIMIT),
        })
    }

    /// Remove the given labels from each message, isolating per-item failures
    async fn bulk_remove_labels(
        &self,
        message_ids: &[String],
        remove: &[&str],
    ) -> Result<BulkResult> {
        if message_ids.is_empty() {
            return Err(ValidationError::EmptyMessageIds.into());
        }

        let token = self.access_token().await?;
        let mut result = BulkResult::default();

        for message_id in message_ids {
            match self.modify_message(&token, message_id, remove).await {
                Ok(()) => {
                    tracing::info!("removed {:?} from message {}", remove, message_id);
                    result.succeeded.push(message_id.clone());
                }
                Err(e) => {
                    tracing::error!("failed to modify message {}: {}", message_id, e);
                    result.failed.push(BulkFailure {
                        id: message_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    /// Issue a single label-removal modify call
    async fn modify_message(&self, token: &str, message_id: &str, remove: &[&str]) -> Result<()> {
        let url = format!("{}/{}/modify", self.messages_url(), message_id);

        let request = ModifyMessageRequest {
            add_label_ids: None,
            remove_label_ids: Some(remove.iter().map(|s| s.to_string()).collect()),
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else if response.status().as_u16() == 404 {
            Err(GmailApiError::MessageNotFound {
                message_id: message_id.to_string(),
            }
            .into())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(GmailApiError::Status { status, message }.into())
        }
    }

    /// Check the status and parse the body into a typed record.
    /// A shape mismatch is a provider error, not a panic.
    async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GmailApiError::Status {
                status: status.as_u16(),
                message: text,
            }
            .into());
        }

        serde_json::from_str(&text).map_err(|e| {
            GmailApiError::UnexpectedShape {
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Validate and default the max_results parameter
fn validate_max_results(max_results: Option<u32>) -> Result<u32> {
    let max = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
    if !(1..=100).contains(&max) {
        return Err(ValidationError::MaxResultsOutOfRange { value: max }.into());
    }
    Ok(max)
}

/// Reduce a label resource to the tool-facing record
fn label_summary(label: Label) -> LabelSummary {
    LabelSummary {
        id: label.id,
        name: label.name,
        label_type: label.label_type.unwrap_or_else(|| "user".to_string()),
        messages_total: label.messages_total,
        messages_unread: label.messages_unread,
        threads_total: label.threads_total,
        threads_unread: label.threads_unread,
    }
}
