//! Filter subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request
//!     → FilterChain::merge(global filters, route filters)
//!     → sorted by rank (lower first; ties: global, then declaration order)
//!     → access_log.rs   rank -1000  wraps everything, logs the outcome
//!     → request_id.rs   rank  -900  assigns/propagates x-request-id
//!     → product_code.rs rank     1  guarded product-code extraction
//!     → route filters   rank  1..n  rewrite.rs, headers.rs
//!     → Endpoint (upstream dispatch)
//! ```
//!
//! # Design Decisions
//! - A filter can rewrite the request, short-circuit with a response or
//!   failure, or call `next` and post-process what comes back
//! - Failures return immediately; the engine hands them to the translator
//! - Route filters are compiled when a snapshot is applied, so an unknown
//!   filter name rejects the snapshot instead of failing requests

pub mod access_log;
pub mod chain;
pub mod headers;
pub mod product_code;
pub mod request_id;
pub mod rewrite;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum::response::Response;

use crate::config::FiltersConfig;
use crate::error::GatewayResult;
use crate::http::request::RequestContext;
use crate::routing::definition::{Component, DefinitionError};

pub use access_log::AccessLogFilter;
pub use chain::{Endpoint, FilterChain, Next};
pub use headers::{AddRequestHeaderFilter, AddResponseHeaderFilter};
pub use product_code::ProductCodeFilter;
pub use request_id::RequestIdFilter;
pub use rewrite::{PrefixPathFilter, StripPrefixFilter};

pub const ACCESS_LOG_RANK: i32 = -1000;
pub const REQUEST_ID_RANK: i32 = -900;
pub const PRODUCT_CODE_RANK: i32 = 1;

/// A cross-cutting step in the request pipeline.
#[async_trait]
pub trait Filter: Send + Sync + std::fmt::Debug {
    async fn apply(&self, ctx: &mut RequestContext, next: Next<'_>) -> GatewayResult<Response>;
}

/// A filter together with its name and rank.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    name: String,
    rank: i32,
    filter: Arc<dyn Filter>,
}

impl FilterSpec {
    pub fn new(name: impl Into<String>, rank: i32, filter: Arc<dyn Filter>) -> Self {
        Self {
            name: name.into(),
            rank,
            filter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rank(&self) -> i32 {
        self.rank
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }
}

/// Gateway-wide filters enabled by configuration, in declaration order.
pub fn global_filters(config: &FiltersConfig) -> Vec<FilterSpec> {
    let mut filters = Vec::new();
    if config.access_log {
        filters.push(FilterSpec::new("AccessLog", ACCESS_LOG_RANK, Arc::new(AccessLogFilter)));
    }
    if config.request_id {
        filters.push(FilterSpec::new("RequestId", REQUEST_ID_RANK, Arc::new(RequestIdFilter)));
    }
    if config.product_code {
        filters.push(FilterSpec::new(
            "ProductCode",
            PRODUCT_CODE_RANK,
            Arc::new(ProductCodeFilter::new(config.product_code_min_segments)),
        ));
    }
    filters
}

/// Compile a route-scoped filter declaration.
///
/// Without an explicit `order`, the filter ranks by its position in the
/// route's filter list (first = 1).
pub fn build_route_filter(component: &Component, index: usize) -> Result<FilterSpec, DefinitionError> {
    let name = component.name.as_str();
    let rank = component
        .order
        .unwrap_or_else(|| i32::try_from(index).map_or(i32::MAX, |i| i.saturating_add(1)));

    let filter: Arc<dyn Filter> = if component.is("StripPrefix") {
        let parts = parse_number(component, &["parts"], 0)?.unwrap_or(1);
        Arc::new(StripPrefixFilter::new(parts))
    } else if component.is("PrefixPath") {
        let prefix = component
            .arg(&["prefix"], 0)
            .filter(|p| p.starts_with('/'))
            .ok_or_else(|| DefinitionError::invalid_argument(name, "prefix must start with '/'"))?;
        Arc::new(PrefixPathFilter::new(prefix))
    } else if component.is("AddRequestHeader") {
        let (header, value) = header_args(component)?;
        Arc::new(AddRequestHeaderFilter::new(header, value))
    } else if component.is("AddResponseHeader") {
        let (header, value) = header_args(component)?;
        Arc::new(AddResponseHeaderFilter::new(header, value))
    } else if component.is("ProductCode") {
        let min_segments = parse_number(component, &["minSegments", "min_segments"], 0)?
            .unwrap_or(product_code::DEFAULT_MIN_SEGMENTS);
        if min_segments < 2 {
            return Err(DefinitionError::invalid_argument(name, "minSegments must be at least 2"));
        }
        Arc::new(ProductCodeFilter::new(min_segments))
    } else {
        return Err(DefinitionError::UnknownFilter(component.name.clone()));
    };

    Ok(FilterSpec::new(name, rank, filter))
}

fn parse_number(
    component: &Component,
    names: &[&str],
    position: usize,
) -> Result<Option<usize>, DefinitionError> {
    component
        .arg(names, position)
        .map(|raw| {
            raw.parse::<usize>().map_err(|_| {
                DefinitionError::invalid_argument(&component.name, format!("'{raw}' is not a count"))
            })
        })
        .transpose()
}

fn header_args(component: &Component) -> Result<(HeaderName, HeaderValue), DefinitionError> {
    let name = component.name.as_str();
    let header = component
        .arg(&["name"], 0)
        .ok_or_else(|| DefinitionError::invalid_argument(name, "missing header name"))?;
    let value = component
        .arg(&["value"], 1)
        .ok_or_else(|| DefinitionError::invalid_argument(name, "missing header value"))?;

    let header = HeaderName::from_bytes(header.as_bytes())
        .map_err(|e| DefinitionError::invalid_argument(name, e.to_string()))?;
    let value = HeaderValue::from_str(&value)
        .map_err(|e| DefinitionError::invalid_argument(name, e.to_string()))?;
    Ok((header, value))
}
