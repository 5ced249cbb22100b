//! mcp-offline server entry point.
//!
//! Boots the offline cache engine for the configured scope, installs the
//! configured generation and serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use stowaway_client::{FetchConfig, HttpFetcher};
use stowaway_core::{AppConfig, CacheDb, CacheStorage, MemoryStorage, StoreBackend};
use stowaway_engine::{CacheEngine, EngineOptions, LifecycleEvent, LifecycleOutcome};

mod handler;
mod tools;

async fn open_storage(config: &AppConfig) -> Result<Arc<dyn CacheStorage>> {
    let storage: Arc<dyn CacheStorage> = match config.store_backend {
        StoreBackend::Memory => Arc::new(MemoryStorage::new()),
        StoreBackend::Sqlite => Arc::new(CacheDb::open(&config.db_path).await?),
    };
    Ok(storage)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        scope = %config.scope_url,
        generation = %config.generation,
        backend = ?config.store_backend,
        "Starting mcp-offline server on stdio transport"
    );

    let storage = open_storage(&config).await?;
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);
    let engine = Arc::new(CacheEngine::new(EngineOptions::from_config(&config)?, storage, fetcher)?);

    if let LifecycleOutcome::Installed(report) = engine
        .handle_lifecycle(LifecycleEvent::Install(config.generation.clone()))
        .await?
    {
        tracing::info!(
            generation = %report.generation,
            state = %report.state,
            cached = report.precache.cached.len(),
            failed = report.precache.failed.len(),
            "generation installed"
        );
    }

    let handler = handler::OfflineServer::new(engine.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    engine.flush_writes().await;

    Ok(())
}
