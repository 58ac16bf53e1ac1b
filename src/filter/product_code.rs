//! Product code extraction.
//!
//! Paths look like `/<service>/<product>/<rest...>`. The service segment is
//! skipped, `<product>` becomes the `product_code` attribute and
//! `/<rest...>` becomes `product_path`. A path with fewer segments than the
//! configured minimum is rejected with a 400 classification.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::{GatewayError, GatewayResult};
use crate::filter::{Filter, Next};
use crate::http::request::{attributes, RequestContext};

pub const DEFAULT_MIN_SEGMENTS: usize = 3;

#[derive(Debug, Clone)]
pub struct ProductCodeFilter {
    min_segments: usize,
}

impl ProductCodeFilter {
    pub fn new(min_segments: usize) -> Self {
        Self {
            min_segments: min_segments.max(2),
        }
    }

    /// Returns `(product_code, remaining_path)`.
    pub fn extract<'p>(&self, path: &'p str) -> GatewayResult<(&'p str, String)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() < self.min_segments {
            return Err(invalid_path());
        }
        match segments.as_slice() {
            [_service, product, rest @ ..] => Ok((*product, format!("/{}", rest.join("/")))),
            _ => Err(invalid_path()),
        }
    }
}

impl Default for ProductCodeFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SEGMENTS)
    }
}

fn invalid_path() -> GatewayError {
    GatewayError::status(StatusCode::BAD_REQUEST, "Invalid request path")
}

#[async_trait]
impl Filter for ProductCodeFilter {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response> {
        let (product, rest) = match self.extract(ctx.path()) {
            Ok((product, rest)) => (product.to_string(), rest),
            Err(err) => {
                tracing::debug!(path = %ctx.path(), min_segments = self.min_segments, "Path too short for product code");
                return Err(err);
            }
        };
        ctx.set_attribute(attributes::PRODUCT_CODE, product);
        ctx.set_attribute(attributes::PRODUCT_PATH, rest);
        next.run(ctx).await
    }
}
