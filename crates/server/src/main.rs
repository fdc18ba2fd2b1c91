//! acadia-sw entry point.
//!
//! Boots one cache agent for the configured release and exposes its events
//! as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use acadia_client::{CacheAgent, FetchConfig, HttpTransport};
use acadia_core::{AppConfig, CacheDb};
use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version_tag, db = %config.db_path.display(), "Starting acadia-sw on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let transport = HttpTransport::new(FetchConfig::from(&config))?;
    let agent = Arc::new(CacheAgent::from_config(&config, Arc::new(db.clone()), Arc::new(transport))?);

    let handler = handler::AgentServer::new(Arc::clone(&agent), db);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    agent.settle().await;

    Ok(())
}
