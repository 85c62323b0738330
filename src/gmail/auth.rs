//! OAuth authentication for the Gmail API
//!
//! Owns the token file lifecycle:
//! - Loading the cached token and checking expiry
//! - Silent refresh against the provider's token endpoint
//! - Interactive browser-based authorization with a local callback listener

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, Result, SetupRequiredError};

/// Refresh the access token this long before its recorded expiry
const REFRESH_MARGIN_SECS: i64 = 300;

/// How long the interactive flow waits for the browser callback
const FLOW_TIMEOUT_SECS: u64 = 300;

/// OAuth client credentials from the Google Cloud JSON
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthKeys {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Authorization endpoint
    pub auth_uri: String,

    /// Token endpoint
    pub token_uri: String,
}

/// OAuth keys file format (can be "installed" or "web")
#[derive(Debug, Deserialize)]
struct OAuthKeysFile {
    #[serde(alias = "web")]
    installed: Option<OAuthKeys>,
}

/// Cached token record, in Google's "authorized user" file layout.
///
/// Treated as opaque except for the expiry check; the client id/secret and
/// token endpoint ride along so refresh needs nothing but this file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    /// Current access token
    pub token: String,

    /// Long-lived refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token endpoint used for refresh
    pub token_uri: String,

    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Granted scopes
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Access token expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the access token is still usable (with a refresh margin)
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => expiry - now > Duration::seconds(REFRESH_MARGIN_SECS),
            None => false,
        }
    }
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

/// Credential store for the Gmail API.
///
/// Single-writer over the configured token file; the process is assumed to
/// own it exclusively.
pub struct Authenticator {
    config: Config,
    http_client: reqwest::Client,
    token: RwLock<Option<StoredToken>>,
}

impl Authenticator {
    /// Create a new authenticator. No I/O happens until credentials are
    /// first requested.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    /// Get valid credentials.
    ///
    /// Non-interactive mode only ever loads or refreshes the cached token;
    /// when that fails the caller gets `SetupRequired` (no token) or an
    /// `Auth` error (refresh rejected). Interactive mode falls through to
    /// the browser flow instead.
    pub async fn get_credentials(&self, interactive: bool) -> Result<StoredToken> {
        let now = Utc::now();

        if let Some(token) = self.token.read().await.as_ref() {
            if token.is_valid(now) {
                return Ok(token.clone());
            }
        }

        let cached = self.load_token_file().await;

        if let Some(token) = &cached {
            if token.is_valid(now) {
                *self.token.write().await = Some(token.clone());
                return Ok(token.clone());
            }

            if token.refresh_token.is_some() {
                match self.refresh(token).await {
                    Ok(refreshed) => return Ok(refreshed),
                    Err(e) if interactive => {
                        tracing::warn!("token refresh failed, re-authenticating: {}", e);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if interactive {
            self.authorize_interactive().await
        } else {
            Err(SetupRequiredError::NoToken {
                path: self.config.token_path.display().to_string(),
            }
            .into())
        }
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.get_credentials(false).await?.token)
    }

    /// Load the token file. A missing or unparseable file is treated as
    /// "no credentials" (manual deletion is the documented recovery path).
    async fn load_token_file(&self) -> Option<StoredToken> {
        let path = &self.config.token_path;
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(_) => return None,
        };

        match serde_json::from_str(&content) {
            Ok(token) => {
                tracing::debug!("loaded cached token from {}", path.display());
                Some(token)
            }
            Err(e) => {
                tracing::warn!("ignoring unparseable token file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Persist a token record, overwriting atomically (temp file + rename)
    async fn save_token(&self, token: &StoredToken) -> Result<()> {
        let path = &self.config.token_path;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(token)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        tracing::debug!("token saved to {}", path.display());
        Ok(())
    }

    /// Exchange the refresh token for a new access token and persist it
    async fn refresh(&self, current: &StoredToken) -> Result<StoredToken> {
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(GmailMcpError::Auth(AuthError::NoRefreshToken))?;

        let params = [
            ("client_id", current.client_id.as_str()),
            ("client_secret", current.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&current.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::RefreshRejected {
                status,
                message,
            }));
        }

        let token_response: TokenResponse = response.json().await?;

        let refreshed = StoredToken {
            token: token_response.access_token,
            refresh_token: token_response.refresh_token.or(Some(refresh_token)),
            token_uri: current.token_uri.clone(),
            client_id: current.client_id.clone(),
            client_secret: current.client_secret.clone(),
            scopes: current.scopes.clone(),
            expiry: token_response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        };

        self.save_token(&refreshed).await?;
        *self.token.write().await = Some(refreshed.clone());

        tracing::info!("refreshed expired access token");
        Ok(refreshed)
    }

    /// Run the interactive authorization-code flow.
    ///
    /// Binds an ephemeral loopback listener, opens the consent URL in a
    /// browser, and waits for the redirect with a fixed timeout.
    pub async fn authorize_interactive(&self) -> Result<StoredToken> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use std::collections::HashMap;
        use std::future::IntoFuture;
        use tokio::sync::oneshot;

        let keys = load_oauth_keys(&self.config.credentials_path)?;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/oauth2callback", port);

        let auth_url = build_auth_url(&keys, &redirect_uri, &self.config.scopes);
        eprintln!("\nPlease visit this URL to authorize Gmail access:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel::<String>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let callback = move |Query(params): Query<HashMap<String, String>>| {
            let tx = tx.clone();
            async move {
                if let Some(code) = params.get("code") {
                    if let Some(tx) = tx.lock().unwrap().take() {
                        let _ = tx.send(code.clone());
                    }
                    Html("<html><body><h1>Authorization complete</h1><p>You can close this window.</p></body></html>")
                } else {
                    Html("<html><body><h1>Authorization failed</h1><p>No authorization code received.</p></body></html>")
                }
            }
        };

        let app = Router::new().route("/oauth2callback", get(callback));
        let server = axum::serve(listener, app).into_future();

        tracing::info!("waiting for authorization callback on port {}", port);

        let code = tokio::select! {
            result = server => {
                let message = match result {
                    Ok(()) => "callback listener exited early".to_string(),
                    Err(e) => e.to_string(),
                };
                return Err(GmailMcpError::Auth(AuthError::CallbackError { message }));
            }
            code = rx => code.map_err(|_| SetupRequiredError::NoAuthCode)?,
            _ = tokio::time::sleep(std::time::Duration::from_secs(FLOW_TIMEOUT_SECS)) => {
                return Err(SetupRequiredError::FlowTimeout { secs: FLOW_TIMEOUT_SECS }.into());
            }
        };

        tracing::info!("received authorization code, exchanging for tokens");
        let token = self.exchange_code(&keys, &redirect_uri, &code).await?;

        self.save_token(&token).await?;
        *self.token.write().await = Some(token.clone());

        Ok(token)
    }

    /// Exchange an authorization code for a token record
    async fn exchange_code(
        &self,
        keys: &OAuthKeys,
        redirect_uri: &str,
        code: &str,
    ) -> Result<StoredToken> {
        let params = [
            ("client_id", keys.client_id.as_str()),
            ("client_secret", keys.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http_client
            .post(&keys.token_uri)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::ExchangeFailed {
                status,
                message,
            }));
        }

        let token_response: TokenResponse = response.json().await?;

        let scopes = if token_response.scope.is_empty() {
            self.config.scopes.clone()
        } else {
            token_response
                .scope
                .split_whitespace()
                .map(|s| s.to_string())
                .collect()
        };

        Ok(StoredToken {
            token: token_response.access_token,
            refresh_token: token_response.refresh_token,
            token_uri: keys.token_uri.clone(),
            client_id: keys.client_id.clone(),
            client_secret: keys.client_secret.clone(),
            scopes,
            expiry: token_response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

/// Load OAuth client keys from the Google Cloud JSON file
fn load_oauth_keys(path: &Path) -> Result<OAuthKeys> {
    if !path.exists() {
        return Err(GmailMcpError::Auth(AuthError::KeysFileNotFound {
            path: path.display().to_string(),
        }));
    }

    let content = std::fs::read_to_string(path)?;
    let keys_file: OAuthKeysFile = serde_json::from_str(&content)?;

    keys_file
        .installed
        .ok_or(GmailMcpError::Auth(AuthError::InvalidKeysFormat))
}

/// Build the provider consent URL
fn build_auth_url(keys: &OAuthKeys, redirect_uri: &str, scopes: &[String]) -> String {
    let scopes = scopes.join(" ");
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        keys.auth_uri,
        urlencoding::encode(&keys.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&scopes)
    )
}
