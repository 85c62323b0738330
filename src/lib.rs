//! Gmail MCP server library
//!
//! A Model Context Protocol (MCP) server exposing Gmail operations as
//! callable tools: list unread, search, archive, mark as read, and list
//! labels. Authenticates against the Gmail REST API via OAuth2 with a
//! locally cached token.

pub mod config;
pub mod error;
pub mod gmail;
pub mod mcp;

pub use config::Config;
pub use error::{GmailMcpError, Result};
