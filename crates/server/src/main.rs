//! waystation server entry point.
//!
//! Loads configuration, brings the offline cache controller into service, and
//! serves MCP tools on stdio. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use waystation_client::fetch::parse_origin;
use waystation_client::{FetchClient, FetchConfig, Registration};
use waystation_core::{AppConfig, CacheDb};

mod boot;
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
    let origin = parse_origin(&config.origin)?;

    tracing::info!(origin = %origin, version = %config.cache_version, db = %config.db_path.display(), "starting waystation");

    let storage = Arc::new(CacheDb::open(&config.db_path).await?);
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let registration = Registration::new(fetcher.clone());

    let serving = boot::start(&registration, config.manifest(), origin.clone(), storage.clone(), fetcher).await?;
    if serving.is_none() {
        tracing::warn!("no cache generation available; requests go to the network only");
    }

    let state = handler::AppState { registration, storage, origin };
    let handler = handler::WaystationServer::new(Arc::new(state));

    tracing::info!("serving MCP tools on stdio transport");
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
