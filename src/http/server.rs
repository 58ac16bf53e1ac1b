//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the axum `Router` with a single catch-all handler
//! - Wire up the trace layer
//! - Serve on a bound listener until shutdown is signalled
//!
//! # Design Decisions
//! - No axum routes of our own: every request, whatever its path or
//!   method, goes to the engine, which owns matching and error answers
//! - Graceful shutdown stops accepting and lets in-flight requests finish

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::engine::GatewayEngine;
use crate::lifecycle::shutdown::ShutdownSignal;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GatewayEngine>,
}

/// HTTP front door of the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(engine: Arc<GatewayEngine>) -> Self {
        Self {
            router: Self::build_router(AppState { engine }),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.engine.handle(request).await
}
