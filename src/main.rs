//! Gmail MCP server
//!
//! Exposes Gmail over the Model Context Protocol: list unread, search,
//! archive, mark as read, and list labels. Run with `--setup` once to
//! authorize, then without flags to serve MCP on stdio.

use std::sync::Arc;

use clap::Parser;

use gmail_mcp::config::Config;
use gmail_mcp::error::Result;
use gmail_mcp::gmail::auth::Authenticator;
use gmail_mcp::gmail::client::GmailClient;
use gmail_mcp::mcp::server::McpServer;

/// Gmail MCP server - access Gmail from MCP clients
#[derive(Parser)]
#[command(name = "gmail-mcp")]
#[command(author, version, about)]
struct Cli {
    /// Run the interactive OAuth setup flow and exit
    #[arg(long)]
    setup: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // All diagnostics go to stderr; stdout is reserved for protocol traffic
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if cli.setup {
        run_setup(config).await;
    } else {
        run_server(config).await?;
    }

    Ok(())
}

/// Run the interactive OAuth flow and exit
async fn run_setup(config: Config) {
    eprintln!("Gmail MCP server - OAuth setup");
    eprintln!("Credentials file: {}", config.credentials_path.display());
    eprintln!("Token will be saved to: {}", config.token_path.display());

    let authenticator = Authenticator::new(config.clone());
    match authenticator.get_credentials(true).await {
        Ok(_) => {
            eprintln!("\nAuthentication successful!");
            eprintln!("Token saved to: {}", config.token_path.display());
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("\nAuthentication failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Start the MCP server on stdio.
///
/// Credentials are acquired lazily on the first tool call; a missing token
/// surfaces as a per-call setup_required failure rather than a startup
/// abort.
async fn run_server(config: Config) -> Result<()> {
    if !config.token_exists() {
        eprintln!(
            "Warning: no cached token at {}. Tool calls will fail until you run 'gmail-mcp --setup'.",
            config.token_path.display()
        );
    }

    let authenticator = Arc::new(Authenticator::new(config));
    let gmail_client = Arc::new(GmailClient::new(authenticator));

    let mut server = McpServer::new(gmail_client);
    server.run_stdio().await
}
