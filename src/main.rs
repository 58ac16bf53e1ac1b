//! Edge Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     EDGE GATEWAY                     │
//!                 │                                                      │
//!  Config source  │  ┌──────────┐   ┌────────────┐   ┌───────────────┐   │
//!  ───────────────┼─▶│   feed   │──▶│ reconciler │──▶│ RouteRegistry │   │
//!  (file / mem)   │  │  client  │   │            │   │  (ArcSwap)    │   │
//!                 │  └──────────┘   └────────────┘   └──────┬────────┘   │
//!                 │                                         │ read-only  │
//!  Client request │  ┌──────────┐   ┌────────────┐   ┌──────▼────────┐   │
//!  ───────────────┼─▶│  http    │──▶│   engine   │──▶│ filter chain  │   │
//!                 │  │  server  │   │            │   │ + upstream    │───┼──▶ Backend
//!  ◀──────────────┼──│          │◀──│ translator │◀──│   dispatch    │   │
//!                 │  └──────────┘   └────────────┘   └───────────────┘   │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use edge_gateway::config::loader::load_config;
use edge_gateway::config::GatewayConfig;
use edge_gateway::feed::FileSource;
use edge_gateway::lifecycle::{signals, startup};
use edge_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "API gateway with push-fed dynamic routes", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    logging::init(&config.observability)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        namespace = %config.feed.namespace,
        group = %config.feed.group,
        root_dir = %config.feed.root_dir,
        "Configuration loaded"
    );

    let source = Arc::new(FileSource::new(&config.feed.root_dir));
    let handle = startup::start(&config, source).await?;

    signals::wait_for_signal().await?;
    tracing::info!("Shutting down");
    handle.shutdown();
    handle.wait().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
