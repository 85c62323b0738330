//! Configuration management for the Gmail MCP server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Name of the required credentials-path environment variable
pub const CREDENTIALS_PATH_VAR: &str = "GMAIL_MCP_CREDENTIALS_PATH";

/// Name of the optional token-path environment variable
pub const TOKEN_PATH_VAR: &str = "GMAIL_MCP_TOKEN_PATH";

/// Configuration for the Gmail MCP server.
///
/// Constructed once at startup from the environment and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the OAuth client credentials JSON from Google Cloud
    pub credentials_path: PathBuf,

    /// Path to the token cache file
    pub token_path: PathBuf,

    /// Gmail API scopes
    pub scopes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// `GMAIL_MCP_CREDENTIALS_PATH` is required; `GMAIL_MCP_TOKEN_PATH`
    /// defaults to `<user config dir>/gmail-mcp/token.json`.
    pub fn from_env() -> Result<Self> {
        let credentials_path = std::env::var(CREDENTIALS_PATH_VAR)
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| expand_tilde(&v))
            .ok_or_else(|| ConfigError::MissingEnvVar {
                var: CREDENTIALS_PATH_VAR.to_string(),
            })?;

        let token_path = match std::env::var(TOKEN_PATH_VAR).ok().filter(|v| !v.is_empty()) {
            Some(v) => expand_tilde(&v),
            None => Self::default_token_path()?,
        };

        Ok(Self {
            credentials_path,
            token_path,
            scopes: vec!["https://www.googleapis.com/auth/gmail.modify".to_string()],
        })
    }

    /// Default token location under the user config directory
    fn default_token_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirUnavailable)?;
        Ok(config_dir.join("gmail-mcp").join("token.json"))
    }

    /// Check if the OAuth client credentials file exists
    pub fn credentials_exist(&self) -> bool {
        self.credentials_path.exists()
    }

    /// Check if a cached token file exists
    pub fn token_exists(&self) -> bool {
        self.token_path.exists()
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for the Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// System label IDs used by the archive and mark-as-read operations
    pub mod labels {
        pub const INBOX: &str = "INBOX";
        pub const UNREAD: &str = "UNREAD";
    }
}
