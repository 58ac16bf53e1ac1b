//! Per-request orchestration.
//!
//! # Flow
//! ```text
//! Request
//!     → registry.current()          table captured once for the whole request
//!     → RequestContext::new
//!     → table.find()                no match → RouteNotFound (filters skipped)
//!     → FilterChain::merge(global, route.filters()).run(ctx, endpoint)
//!     → Ok(response)  → ctx.write_response
//!       Err(failure)  → ErrorTranslator::handle (classify → render → write)
//!     → ctx.take_response()         exactly one response leaves
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::{self, Endpoint, FilterChain, FilterSpec};
use crate::http::request::RequestContext;
use crate::http::response::{fallback_response, ErrorTranslator};
use crate::http::upstream::UpstreamDispatcher;
use crate::observability::metrics;
use crate::routing::{RouteRegistry, RouteTable};

/// Turns each inbound request into exactly one response.
pub struct GatewayEngine {
    registry: Arc<RouteRegistry>,
    global_filters: Vec<FilterSpec>,
    endpoint: Arc<dyn Endpoint>,
    translator: ErrorTranslator,
}

impl GatewayEngine {
    pub fn new(
        registry: Arc<RouteRegistry>,
        global_filters: Vec<FilterSpec>,
        endpoint: Arc<dyn Endpoint>,
    ) -> Self {
        Self {
            registry,
            global_filters,
            endpoint,
            translator: ErrorTranslator::new(),
        }
    }

    /// Engine with the configured global filters and an HTTP upstream dispatcher.
    pub fn from_config(config: &GatewayConfig, registry: Arc<RouteRegistry>) -> Self {
        Self::new(
            registry,
            filter::global_filters(&config.filters),
            Arc::new(UpstreamDispatcher::new(&config.upstream)),
        )
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub async fn handle(&self, request: Request<Body>) -> Response {
        let table = self.registry.current();
        let method = request.method().to_string();
        let mut ctx = RequestContext::new(request, table.generation());

        match self.process(&table, &mut ctx).await {
            Ok(response) => {
                if let Err(e) = ctx.write_response(response) {
                    tracing::error!(
                        request_id = ctx.request_id().unwrap_or("-"),
                        error = %e,
                        "Dropping pipeline response; one was already written"
                    );
                }
            }
            Err(failure) => {
                if let Err(e) = self.translator.handle(&mut ctx, failure) {
                    tracing::debug!(error = %e, "Failure not rendered");
                }
            }
        }

        let response = ctx.take_response().unwrap_or_else(fallback_response);
        let route = ctx.route().map(|r| r.id()).unwrap_or("none");
        metrics::record_request(&method, response.status().as_u16(), route, ctx.started_at());
        response
    }

    async fn process(&self, table: &RouteTable, ctx: &mut RequestContext) -> GatewayResult<Response> {
        let route = table
            .find(ctx.request())
            .cloned()
            .ok_or_else(|| GatewayError::RouteNotFound {
                path: ctx.path().to_string(),
            })?;
        ctx.set_route(Arc::clone(&route));

        FilterChain::merge(&self.global_filters, route.filters())
            .run(ctx, self.endpoint.as_ref())
            .await
    }
}

impl std::fmt::Debug for GatewayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayEngine")
            .field("generation", &self.registry.generation())
            .field("global_filters", &self.global_filters.len())
            .finish_non_exhaustive()
    }
}
