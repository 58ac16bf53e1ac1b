//! Path rewriting filters.

use std::str::FromStr;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{Request, StatusCode, Uri};
use axum::response::Response;

use crate::error::{GatewayError, GatewayResult};
use crate::filter::{Filter, Next};
use crate::http::request::RequestContext;

/// Replace the request path, keeping the query string.
pub(crate) fn set_path(request: &mut Request<Body>, path: &str) -> GatewayResult<()> {
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let path_and_query = PathAndQuery::from_str(&path_and_query).map_err(|e| {
        GatewayError::status(StatusCode::BAD_REQUEST, format!("invalid rewritten path: {e}"))
    })?;

    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    *request.uri_mut() = Uri::from_parts(parts).map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(())
}

/// Drops the first `parts` path segments before forwarding.
#[derive(Debug, Clone)]
pub struct StripPrefixFilter {
    parts: usize,
}

impl StripPrefixFilter {
    pub fn new(parts: usize) -> Self {
        Self { parts }
    }

    fn strip(&self, path: &str) -> String {
        let rest: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .skip(self.parts)
            .collect();
        let mut stripped = format!("/{}", rest.join("/"));
        if path.ends_with('/') && !rest.is_empty() {
            stripped.push('/');
        }
        stripped
    }
}

#[async_trait]
impl Filter for StripPrefixFilter {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response> {
        let stripped = self.strip(ctx.path());
        set_path(ctx.request_mut(), &stripped)?;
        next.run(ctx).await
    }
}

/// Prepends a fixed prefix to the path before forwarding.
#[derive(Debug, Clone)]
pub struct PrefixPathFilter {
    prefix: String,
}

impl PrefixPathFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Filter for PrefixPathFilter {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response> {
        let prefixed = format!("{}{}", self.prefix, ctx.path());
        set_path(ctx.request_mut(), &prefixed)?;
        next.run(ctx).await
    }
}
