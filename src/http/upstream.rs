//! Upstream dispatch: the endpoint at the end of every filter chain.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the matched route's target
//! - Strip hop-by-hop headers (and `Host`, which the client re-derives)
//! - Forward with bounded connect and whole-call timeouts
//! - Return the upstream response unchanged, body streamed
//!
//! # Design Decisions
//! - Connection failures map to `Upstream` (502), deadline to
//!   `UpstreamTimeout` (504); both reach the client through the translator
//! - No retries: the request body is streamed once and never buffered

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::Request;
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::UpstreamConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::Endpoint;
use crate::http::request::RequestContext;

static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Forwards matched requests to their route's target.
#[derive(Clone)]
pub struct UpstreamDispatcher {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl UpstreamDispatcher {
    pub fn new(config: &UpstreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Override the whole-call deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for UpstreamDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamDispatcher")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in `Connection` are hop-by-hop too.
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

#[async_trait]
impl Endpoint for UpstreamDispatcher {
    async fn call(&self, ctx: &mut RequestContext) -> GatewayResult<Response> {
        let route = ctx
            .route()
            .cloned()
            .ok_or_else(|| GatewayError::Internal("dispatch without a matched route".into()))?;
        let target = route.target();

        let path_and_query = ctx
            .request()
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let uri = target
            .uri_for(&path_and_query)
            .map_err(|e| GatewayError::Internal(format!("bad upstream uri: {e}")))?;

        let inbound = ctx.request_mut();
        let mut builder = Request::builder()
            .method(inbound.method().clone())
            .uri(uri.clone());
        if let Some(headers) = builder.headers_mut() {
            *headers = std::mem::take(inbound.headers_mut());
            strip_hop_by_hop(headers);
            headers.remove(header::HOST);
        }
        let body = std::mem::take(inbound.body_mut());
        let outbound = builder
            .body(body)
            .map_err(|e| GatewayError::Internal(format!("bad upstream request: {e}")))?;

        tracing::debug!(
            route = %route.id(),
            upstream = %uri,
            request_id = ctx.request_id().unwrap_or("-"),
            "Dispatching upstream"
        );

        let response = match tokio::time::timeout(self.request_timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(GatewayError::Upstream {
                    target: target.as_str().to_string(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(GatewayError::UpstreamTimeout {
                    target: target.as_str().to_string(),
                    timeout: self.request_timeout,
                })
            }
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
