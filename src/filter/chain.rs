//! Ordered execution of filters around a terminal endpoint.
//!
//! ```text
//! FilterChain::run(ctx, endpoint)
//!     → filter[0].apply(ctx, next)      lowest rank first
//!         → next.run(ctx) → filter[1].apply(ctx, next) ...
//!             → endpoint.call(ctx)      upstream dispatch
//! ```
//!
//! A filter that returns without calling `next` short-circuits the rest of
//! the chain, with either a response or a failure.

use async_trait::async_trait;
use axum::response::Response;

use crate::error::GatewayResult;
use crate::filter::FilterSpec;
use crate::http::request::RequestContext;

/// What runs after the last filter.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext) -> GatewayResult<Response>;
}

/// The filters that apply to one request, sorted by rank.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<FilterSpec>,
}

impl FilterChain {
    /// Sort by rank; equal ranks keep the order given.
    pub fn new(mut filters: Vec<FilterSpec>) -> Self {
        filters.sort_by_key(FilterSpec::rank);
        Self { filters }
    }

    /// Interleave gateway-wide and route-scoped filters.
    ///
    /// On equal rank a global filter runs before a route filter.
    pub fn merge(global: &[FilterSpec], route: &[FilterSpec]) -> Self {
        Self::new(global.iter().chain(route).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(FilterSpec::name).collect()
    }

    pub async fn run(
        &self,
        ctx: &mut RequestContext,
        endpoint: &dyn Endpoint,
    ) -> GatewayResult<Response> {
        Next {
            remaining: &self.filters,
            endpoint,
        }
        .run(ctx)
        .await
    }
}

/// The rest of the chain, handed to each filter.
pub struct Next<'a> {
    remaining: &'a [FilterSpec],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// Invoke the next filter, or the endpoint when none are left.
    pub async fn run(self, ctx: &mut RequestContext) -> GatewayResult<Response> {
        match self.remaining.split_first() {
            Some((spec, rest)) => {
                let next = Next {
                    remaining: rest,
                    endpoint: self.endpoint,
                };
                spec.filter().apply(ctx, next).await
            }
            None => self.endpoint.call(ctx).await,
        }
    }
}
