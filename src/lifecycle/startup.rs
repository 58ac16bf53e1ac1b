//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build registry, reconciler, engine in dependency order
//! - Start the config feed client and the HTTP server as background tasks
//!
//! # Design Decisions
//! - Fail fast: invalid config or an unbindable address is fatal
//! - The listener starts immediately with an empty table; requests are
//!   answered with 404 until the first snapshot lands
//! - The handle owns shutdown: triggering it stops the feed and drains the server

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::GatewayConfig;
use crate::engine::GatewayEngine;
use crate::feed::{ConfigFeedClient, ConfigSource};
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::routing::{Reconciler, RouteRegistry};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", format_validation(.0))]
    InvalidConfig(Vec<ValidationError>),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("gateway task failed: {0}")]
    Task(String),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A running gateway.
#[derive(Debug)]
pub struct GatewayHandle {
    local_addr: SocketAddr,
    registry: Arc<RouteRegistry>,
    shutdown: Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
    feed: JoinHandle<()>,
}

impl GatewayHandle {
    /// Address the server actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    /// Ask every task to stop.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Wait for the server and the feed client to finish.
    ///
    /// The feed client is stopped as soon as the server exits, whatever the
    /// reason.
    pub async fn wait(self) -> Result<(), StartupError> {
        let server = self.server.await;
        self.shutdown.trigger();
        let feed = self.feed.await;

        feed.map_err(|e| StartupError::Task(e.to_string()))?;
        server
            .map_err(|e| StartupError::Task(e.to_string()))?
            .map_err(|e| StartupError::Task(e.to_string()))
    }
}

/// Bring the gateway up and return once it is accepting connections.
pub async fn start(config: &GatewayConfig, source: Arc<dyn ConfigSource>) -> Result<GatewayHandle, StartupError> {
    validate_config(config).map_err(StartupError::InvalidConfig)?;

    let registry = Arc::new(RouteRegistry::new());
    let reconciler = Arc::new(Reconciler::new(Arc::clone(&registry)));
    let engine = Arc::new(GatewayEngine::from_config(config, Arc::clone(&registry)));
    let shutdown = Shutdown::new();

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| StartupError::Bind { address, source })?;

    let client = ConfigFeedClient::new(source, reconciler, &config.feed);
    tracing::info!(key = %client.key(), "Starting config feed client");
    let feed = tokio::spawn(client.run(shutdown.signal()));

    let server = tokio::spawn(HttpServer::new(engine).run(listener, shutdown.signal()));

    tracing::info!(address = %local_addr, "Gateway started");
    Ok(GatewayHandle {
        local_addr,
        registry,
        shutdown,
        server,
        feed,
    })
}
