//! Gmail API module
//!
//! Contains types, authentication, and client for interacting with the Gmail API.

pub mod auth;
pub mod client;
pub mod types;
pub mod utils;
