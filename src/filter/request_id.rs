//! Request correlation id.
//!
//! Reuses a well-formed inbound `x-request-id`, otherwise generates a UUID
//! v4. The id is stored as the `request_id` attribute, forwarded upstream
//! and echoed on the response.

use async_trait::async_trait;
use axum::http::HeaderValue;
use axum::response::Response;
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::filter::{Filter, Next};
use crate::http::request::{attributes, RequestContext, X_REQUEST_ID};

const MAX_INBOUND_ID_LEN: usize = 128;

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdFilter;

impl RequestIdFilter {
    fn inbound(ctx: &RequestContext) -> Option<String> {
        ctx.request()
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_INBOUND_ID_LEN)
            .map(str::to_string)
    }
}

#[async_trait]
impl Filter for RequestIdFilter {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response> {
        let id = Self::inbound(ctx).unwrap_or_else(|| Uuid::new_v4().to_string());
        let header = HeaderValue::from_str(&id).ok();

        if let Some(value) = &header {
            ctx.request_mut().headers_mut().insert(X_REQUEST_ID, value.clone());
        }
        ctx.set_attribute(attributes::REQUEST_ID, id);

        let mut response = next.run(ctx).await?;
        if let Some(value) = header {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        Ok(response)
    }
}
