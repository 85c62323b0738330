//! Gmail client behavior against a local fixture server
//!
//! These tests stand in for the Gmail REST API with an axum server bound to
//! an ephemeral port. The fixture records every request it sees, so the
//! tests can assert not just on results but on exactly what was sent (and
//! on what was never sent at all).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use gmail_mcp::config::Config;
use gmail_mcp::error::GmailMcpError;
use gmail_mcp::gmail::auth::{Authenticator, StoredToken};
use gmail_mcp::gmail::client::GmailClient;

// ==================== Fixture server ====================

#[derive(Default)]
struct MockGmail {
    /// Requests seen by any Gmail endpoint
    gmail_hits: AtomicUsize,

    /// Requests seen by the token endpoint
    token_hits: AtomicUsize,

    /// Bodies posted to the modify endpoint, as (message id, body)
    modify_bodies: Mutex<Vec<(String, Value)>>,

    /// Message list response
    list_response: Mutex<Value>,

    /// Full message fixtures by id
    messages: Mutex<HashMap<String, Value>>,

    /// Label list response
    labels_response: Mutex<Value>,

    /// IDs for which modify returns 404
    missing_ids: Mutex<Vec<String>>,
}

async fn list_messages(
    State(state): State<Arc<MockGmail>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.gmail_hits.fetch_add(1, Ordering::SeqCst);

    let mut response = state.list_response.lock().unwrap().clone();
    if let Some(max) = params.get("maxResults").and_then(|m| m.parse::<usize>().ok()) {
        if let Some(messages) = response.get_mut("messages").and_then(|m| m.as_array_mut()) {
            messages.truncate(max);
        }
    }

    Json(response)
}

async fn get_message(
    State(state): State<Arc<MockGmail>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.gmail_hits.fetch_add(1, Ordering::SeqCst);

    match state.messages.lock().unwrap().get(&id) {
        Some(message) => (StatusCode::OK, Json(message.clone())),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": 404, "message": "Requested entity was not found."}})),
        ),
    }
}

async fn modify_message(
    State(state): State<Arc<MockGmail>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.gmail_hits.fetch_add(1, Ordering::SeqCst);
    state.modify_bodies.lock().unwrap().push((id.clone(), body));

    if state.missing_ids.lock().unwrap().contains(&id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": {"code": 404, "message": "Requested entity was not found."}})),
        );
    }

    (StatusCode::OK, Json(json!({"id": id})))
}

async fn list_labels(State(state): State<Arc<MockGmail>>) -> Json<Value> {
    state.gmail_hits.fetch_add(1, Ordering::SeqCst);
    Json(state.labels_response.lock().unwrap().clone())
}

async fn token_endpoint(State(state): State<Arc<MockGmail>>) -> Json<Value> {
    state.token_hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "access_token": "fresh-access-token",
        "expires_in": 3600,
        "token_type": "Bearer",
        "scope": "https://www.googleapis.com/auth/gmail.modify"
    }))
}

async fn spawn_mock(state: Arc<MockGmail>) -> SocketAddr {
    let app = Router::new()
        .route("/users/me/messages", get(list_messages))
        .route("/users/me/messages/:id", get(get_message))
        .route("/users/me/messages/:id/modify", post(modify_message))
        .route("/users/me/labels", get(list_labels))
        .route("/token", post(token_endpoint))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// ==================== Test helpers ====================

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_config() -> Config {
    let dir = std::env::temp_dir().join(format!(
        "gmail-mcp-test-{}-{}",
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();

    Config {
        credentials_path: dir.join("credentials.json"),
        token_path: dir.join("token.json"),
        scopes: vec!["https://www.googleapis.com/auth/gmail.modify".to_string()],
    }
}

fn write_token(path: &PathBuf, expires_in_secs: i64, token_uri: &str) -> StoredToken {
    let token = StoredToken {
        token: "cached-access-token".to_string(),
        refresh_token: Some("cached-refresh-token".to_string()),
        token_uri: token_uri.to_string(),
        client_id: "test-client-id".to_string(),
        client_secret: "test-client-secret".to_string(),
        scopes: vec!["https://www.googleapis.com/auth/gmail.modify".to_string()],
        expiry: Some(Utc::now() + Duration::seconds(expires_in_secs)),
    };
    std::fs::write(path, serde_json::to_string_pretty(&token).unwrap()).unwrap();
    token
}

/// A client with a valid cached token, pointed at the fixture server
fn client_with_valid_token(addr: SocketAddr) -> GmailClient {
    let config = temp_config();
    write_token(&config.token_path, 3600, &format!("http://{}/token", addr));
    let authenticator = Arc::new(Authenticator::new(config));
    GmailClient::with_base_url(authenticator, format!("http://{}", addr))
}

fn message_fixture(id: &str, subject: &str, sender: &str) -> Value {
    json!({
        "id": id,
        "threadId": format!("thread-{}", id),
        "labelIds": ["INBOX", "UNREAD"],
        "snippet": format!("snippet for {}", id),
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                {"name": "From", "value": sender},
                {"name": "To", "value": "me@example.com"},
                {"name": "Subject", "value": subject},
                {"name": "Date", "value": "Mon, 2 Jun 2025 09:30:00 +0000"}
            ],
            "body": {
                "size": 9,
                "data": URL_SAFE_NO_PAD.encode(b"body text")
            }
        }
    })
}

// ==================== Validation short-circuits ====================

#[tokio::test]
async fn out_of_range_max_results_issues_no_request() {
    let state = Arc::new(MockGmail::default());
    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    for bad in [0u32, 101, 500] {
        let err = client.list_unread(Some(bad)).await.unwrap_err();
        assert!(matches!(err, GmailMcpError::Validation(_)), "got {:?}", err);

        let err = client.search("is:unread", Some(bad)).await.unwrap_err();
        assert!(matches!(err, GmailMcpError::Validation(_)));
    }

    assert_eq!(state.gmail_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_message_ids_rejected_before_any_remote_call() {
    let state = Arc::new(MockGmail::default());
    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let err = client.archive(&[]).await.unwrap_err();
    assert!(matches!(err, GmailMcpError::Validation(_)));

    let err = client.mark_as_read(&[]).await.unwrap_err();
    assert!(matches!(err, GmailMcpError::Validation(_)));

    assert_eq!(state.gmail_hits.load(Ordering::SeqCst), 0);
}

// ==================== Label removal semantics ====================

#[tokio::test]
async fn archive_removes_exactly_inbox_and_unread() {
    let state = Arc::new(MockGmail::default());
    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let result = client.archive(&["m1".to_string()]).await.unwrap();
    assert_eq!(result.succeeded, vec!["m1"]);
    assert!(result.failed.is_empty());

    let bodies = state.modify_bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].0, "m1");
    assert_eq!(bodies[0].1, json!({"removeLabelIds": ["INBOX", "UNREAD"]}));
}

#[tokio::test]
async fn mark_as_read_removes_only_unread() {
    let state = Arc::new(MockGmail::default());
    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let result = client.mark_as_read(&["m1".to_string()]).await.unwrap();
    assert_eq!(result.succeeded, vec!["m1"]);

    let bodies = state.modify_bodies.lock().unwrap();
    assert_eq!(bodies[0].1, json!({"removeLabelIds": ["UNREAD"]}));
}

#[tokio::test]
async fn batch_isolates_per_item_failures() {
    let state = Arc::new(MockGmail::default());
    *state.missing_ids.lock().unwrap() = vec!["m2".to_string()];
    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let ids: Vec<String> = ["m1", "m2", "m3"].iter().map(|s| s.to_string()).collect();
    let result = client.archive(&ids).await.unwrap();

    assert_eq!(result.succeeded, vec!["m1", "m3"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].id, "m2");
    assert!(result.failed[0].error.contains("not found"));

    // The bad id did not stop its siblings from being attempted
    assert_eq!(state.modify_bodies.lock().unwrap().len(), 3);
}

// ==================== Search and list ====================

#[tokio::test]
async fn search_returns_fixture_order_capped_at_max_results() {
    let state = Arc::new(MockGmail::default());

    let refs: Vec<Value> = (1..=7)
        .map(|i| json!({"id": format!("msg-{}", i), "threadId": format!("thread-msg-{}", i)}))
        .collect();
    *state.list_response.lock().unwrap() = json!({"messages": refs, "resultSizeEstimate": 7});

    {
        let mut messages = state.messages.lock().unwrap();
        for i in 1..=7 {
            let id = format!("msg-{}", i);
            messages.insert(
                id.clone(),
                message_fixture(&id, &format!("Subject {}", i), "alice@example.com"),
            );
        }
    }

    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let results = client
        .search("is:unread newer_than:1d", Some(5))
        .await
        .unwrap();

    assert_eq!(results.len(), 5);
    for (i, summary) in results.iter().enumerate() {
        assert_eq!(summary.id, format!("msg-{}", i + 1));
        assert!(!summary.subject.is_empty());
    }
}

#[tokio::test]
async fn list_unread_builds_full_summaries() {
    let state = Arc::new(MockGmail::default());
    *state.list_response.lock().unwrap() =
        json!({"messages": [{"id": "m1", "threadId": "t1"}], "resultSizeEstimate": 1});
    state
        .messages
        .lock()
        .unwrap()
        .insert("m1".to_string(), message_fixture("m1", "Invoice", "billing@example.com"));

    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let results = client.list_unread(None).await.unwrap();
    assert_eq!(results.len(), 1);

    let summary = &results[0];
    assert_eq!(summary.id, "m1");
    assert_eq!(summary.sender, "billing@example.com");
    assert_eq!(summary.subject, "Invoice");
    assert_eq!(summary.date, "2025-06-02 09:30");
    assert_eq!(summary.snippet, "snippet for m1");
    assert_eq!(summary.labels, vec!["INBOX", "UNREAD"]);
    assert_eq!(summary.body_preview, "body text");
}

#[tokio::test]
async fn empty_list_response_yields_no_summaries() {
    let state = Arc::new(MockGmail::default());
    // Gmail omits "messages" entirely when nothing matches
    *state.list_response.lock().unwrap() = json!({"resultSizeEstimate": 0});

    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let results = client.list_unread(Some(10)).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn get_labels_maps_counts_and_types() {
    let state = Arc::new(MockGmail::default());
    *state.labels_response.lock().unwrap() = json!({
        "labels": [
            {"id": "INBOX", "name": "INBOX", "type": "system", "messagesTotal": 42, "messagesUnread": 7},
            {"id": "Label_3", "name": "Receipts", "type": "user", "threadsTotal": 12}
        ]
    });

    let addr = spawn_mock(state.clone()).await;
    let client = client_with_valid_token(addr);

    let labels = client.get_labels().await.unwrap();
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].label_type, "system");
    assert_eq!(labels[0].messages_unread, Some(7));
    assert_eq!(labels[1].name, "Receipts");
    assert_eq!(labels[1].threads_total, Some(12));
}

// ==================== Token lifecycle ====================

#[tokio::test]
async fn expired_token_triggers_exactly_one_refresh_and_persists_expiry() {
    let state = Arc::new(MockGmail::default());
    let addr = spawn_mock(state.clone()).await;

    let config = temp_config();
    write_token(
        &config.token_path,
        -60, // already expired
        &format!("http://{}/token", addr),
    );

    let authenticator = Authenticator::new(config.clone());
    let creds = authenticator.get_credentials(false).await.unwrap();

    assert_eq!(creds.token, "fresh-access-token");
    assert_eq!(state.token_hits.load(Ordering::SeqCst), 1);

    // The new record (including expiry) hit disk before we returned
    let persisted: StoredToken =
        serde_json::from_str(&std::fs::read_to_string(&config.token_path).unwrap()).unwrap();
    assert_eq!(persisted.token, "fresh-access-token");
    assert_eq!(persisted.refresh_token, Some("cached-refresh-token".to_string()));
    assert!(persisted.expiry.unwrap() > Utc::now());

    // A second request uses the in-memory token; no second exchange
    let _ = authenticator.get_credentials(false).await.unwrap();
    assert_eq!(state.token_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_rejection_is_an_authentication_error() {
    // Point the token_uri at an endpoint that doesn't exist on the mock,
    // which answers 404 to the refresh attempt.
    let state = Arc::new(MockGmail::default());
    let addr = spawn_mock(state.clone()).await;

    let config = temp_config();
    write_token(&config.token_path, -60, &format!("http://{}/revoked", addr));

    let authenticator = Authenticator::new(config);
    let err = authenticator.get_credentials(false).await.unwrap_err();
    assert!(matches!(err, GmailMcpError::Auth(_)), "got {:?}", err);
}

#[tokio::test]
async fn missing_token_without_interactivity_is_setup_required() {
    let state = Arc::new(MockGmail::default());
    let addr = spawn_mock(state.clone()).await;

    let config = temp_config(); // no token file written
    let authenticator = Authenticator::new(config);

    let err = authenticator.get_credentials(false).await.unwrap_err();
    assert!(matches!(err, GmailMcpError::SetupRequired(_)), "got {:?}", err);

    assert_eq!(state.token_hits.load(Ordering::SeqCst), 0);
    assert_eq!(state.gmail_hits.load(Ordering::SeqCst), 0);
    let _ = addr;
}

#[tokio::test]
async fn corrupted_token_file_is_treated_as_no_credentials() {
    let config = temp_config();
    std::fs::write(&config.token_path, "{ not json").unwrap();

    let authenticator = Authenticator::new(config);
    let err = authenticator.get_credentials(false).await.unwrap_err();
    assert!(matches!(err, GmailMcpError::SetupRequired(_)));
}

#[tokio::test]
async fn token_file_round_trips_byte_identical_tokens() {
    let config = temp_config();
    let written = write_token(&config.token_path, 3600, "https://oauth2.googleapis.com/token");

    let reloaded: StoredToken =
        serde_json::from_str(&std::fs::read_to_string(&config.token_path).unwrap()).unwrap();

    assert_eq!(reloaded.token, written.token);
    assert_eq!(reloaded.refresh_token, written.refresh_token);
    assert_eq!(reloaded.expiry, written.expiry);
}
