//! Error types for the Gmail MCP server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Gmail MCP server
#[derive(Error, Debug)]
pub enum GmailMcpError {
    /// Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No usable credentials in a non-interactive context
    #[error("Setup required: {0}")]
    SetupRequired(#[from] SetupRequiredError),

    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Tool input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Gmail API errors
    #[error("Gmail API error: {0}")]
    Gmail(#[from] GmailApiError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GmailMcpError {
    /// Stable kind string used in structured tool failure payloads
    pub fn kind(&self) -> &'static str {
        match self {
            GmailMcpError::Config(_) => "configuration_error",
            GmailMcpError::SetupRequired(_) => "setup_required",
            GmailMcpError::Auth(_) => "authentication_error",
            GmailMcpError::Validation(_) => "validation_error",
            GmailMcpError::Gmail(_) => "gmail_api_error",
            GmailMcpError::Io(_) | GmailMcpError::Json(_) | GmailMcpError::Http(_) => {
                "internal_error"
            }
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: String },

    #[error("Could not determine user config directory")]
    ConfigDirUnavailable,
}

/// Raised when credentials are needed but cannot be obtained without user
/// interaction. The tool layer surfaces this as "run --setup first".
#[derive(Error, Debug)]
pub enum SetupRequiredError {
    #[error("no cached token at {path}; run 'gmail-mcp --setup' to authenticate")]
    NoToken { path: String },

    #[error("authorization flow timed out after {secs} seconds")]
    FlowTimeout { secs: u64 },

    #[error("authorization flow did not return a code")]
    NoAuthCode,
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("OAuth credentials file not found: {path}")]
    KeysFileNotFound { path: String },

    #[error("Invalid OAuth credentials format: expected 'installed' or 'web' client")]
    InvalidKeysFormat,

    #[error("Token refresh rejected ({status}): {message}")]
    RefreshRejected { status: u16, message: String },

    #[error("Stored token has no refresh token")]
    NoRefreshToken,

    #[error("Token exchange failed ({status}): {message}")]
    ExchangeFailed { status: u16, message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },
}

/// Tool input validation errors, rejected before any remote call
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("max_results must be between 1 and 100, got {value}")]
    MaxResultsOutOfRange { value: u32 },

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("message_ids must not be empty")]
    EmptyMessageIds,
}

/// Gmail API errors, carrying the provider's status and message
#[derive(Error, Debug)]
pub enum GmailApiError {
    #[error("request failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("unexpected response shape: {message}")]
    UnexpectedShape { message: String },
}

/// Result type alias for Gmail MCP operations
pub type Result<T> = std::result::Result<T, GmailMcpError>;
