//! MCP (Model Context Protocol) module
//!
//! Stdio JSON-RPC server, tool registry, and protocol types.

pub mod server;
pub mod tools;
pub mod types;
