//! mail-gmail-mcp-rs: Gmail MCP server over stdio
//!
//! This server exposes a Gmail mailbox as MCP tools over stdio: composing
//! and sending MIME messages, extracting message bodies with HTML paging,
//! searching, label management, attachment download, and thread summaries.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with env loading and stdio serving
//! - [`config`]: Environment-driven configuration for API access
//! - [`errors`]: Application error model with MCP error mapping
//! - [`compose`]: MIME message construction from structured fields
//! - [`extract`]: Recursive MIME body extraction and base64url decoding
//! - [`gmail`]: Gmail REST API collaborator
//! - [`labels`]: Label lookup and closed-set update validation
//! - [`server`]: MCP tool handlers with validation and business orchestration
//! - [`models`]: Input/output DTOs and schema-bearing types

mod compose;
mod config;
mod errors;
mod extract;
mod gmail;
mod labels;
mod models;
mod server;

use config::ServerConfig;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

/// Application entry point
///
/// Initializes tracing from environment, loads config, and serves the MCP
/// server over stdio. This process expects to be spawned by an MCP client
/// via `stdio` transport.
///
/// # Environment Variables
///
/// See [`ServerConfig::load_from_env`] for full configuration options.
///
/// # Example
///
/// ```no_run
/// GMAIL_ACCESS_TOKEN=ya29.... \
/// GMAIL_SENDER=user@gmail.com \
/// cargo run
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::load_from_env()?;
    let service = server::GmailMcpServer::new(config)?.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
