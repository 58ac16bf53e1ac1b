//! One structured log line per routed request.
//!
//! Runs outermost, so the logged latency covers every other filter and the
//! upstream call. Failures are logged with the status the translator will
//! give them.

use async_trait::async_trait;
use axum::response::Response;

use crate::error::GatewayResult;
use crate::filter::{Filter, Next};
use crate::http::request::{attributes, RequestContext};
use crate::http::response::classify;

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLogFilter;

#[async_trait]
impl Filter for AccessLogFilter {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response> {
        let method = ctx.method().clone();
        let path = ctx.path().to_string();

        let result = next.run(ctx).await;

        let route = ctx.route().map(|r| r.id().to_string()).unwrap_or_default();
        let request_id = ctx.request_id().unwrap_or("-");
        let product_code = ctx.attribute(attributes::PRODUCT_CODE).unwrap_or("-");
        let latency_ms = ctx.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => tracing::info!(
                request_id,
                method = %method,
                path = %path,
                route = %route,
                product_code,
                status = response.status().as_u16(),
                latency_ms,
                "Request completed"
            ),
            Err(err) => tracing::warn!(
                request_id,
                method = %method,
                path = %path,
                route = %route,
                product_code,
                status = classify(err).status.as_u16(),
                latency_ms,
                error = %err,
                "Request failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::filter::{Endpoint, FilterChain, FilterSpec};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;

    struct Failing;

    #[async_trait]
    impl Endpoint for Failing {
        async fn call(&self, _ctx: &mut RequestContext) -> GatewayResult<Response> {
            Err(GatewayError::status(StatusCode::FORBIDDEN, "denied"))
        }
    }

    #[tokio::test]
    async fn test_failure_passes_through_unchanged() {
        let chain = FilterChain::new(vec![FilterSpec::new("AccessLog", -1000, Arc::new(AccessLogFilter))]);
        let mut ctx = RequestContext::new(Request::builder().uri("/a").body(Body::empty()).unwrap(), 1);
        let err = chain.run(&mut ctx, &Failing).await.unwrap_err();
        match err {
            GatewayError::Status { status, message } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "denied");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!ctx.is_committed());
    }
}
