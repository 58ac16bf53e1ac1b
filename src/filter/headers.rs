//! Header manipulation filters.

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;

use crate::error::GatewayResult;
use crate::filter::{Filter, Next};
use crate::http::request::RequestContext;

/// Adds a header to the request sent upstream.
#[derive(Debug, Clone)]
pub struct AddRequestHeaderFilter {
    name: HeaderName,
    value: HeaderValue,
}

impl AddRequestHeaderFilter {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

#[async_trait]
impl Filter for AddRequestHeaderFilter {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response> {
        ctx.request_mut()
            .headers_mut()
            .append(self.name.clone(), self.value.clone());
        next.run(ctx).await
    }
}

/// Adds a header to the response returned to the client.
#[derive(Debug, Clone)]
pub struct AddResponseHeaderFilter {
    name: HeaderName,
    value: HeaderValue,
}

impl AddResponseHeaderFilter {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

#[async_trait]
impl Filter for AddResponseHeaderFilter {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response> {
        let mut response = next.run(ctx).await?;
        response
            .headers_mut()
            .append(self.name.clone(), self.value.clone());
        Ok(response)
    }
}
