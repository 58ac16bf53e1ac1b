//! Per-request state.
//!
//! # Responsibilities
//! - Own the inbound request while it moves through the pipeline
//! - Remember which route (and which table generation) matched it
//! - Collect attributes produced by filters (request id, product code)
//! - Carry the single error classification from the classify step to the
//!   render step
//! - Hold the one response slot; writing twice is refused
//!
//! # Design Decisions
//! - Created per request and owned by the handling task; never shared, so
//!   nothing in here is synchronised
//! - The classification travels inside the context, never through a shared
//!   slot, so concurrent requests cannot observe each other's failures

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;

use crate::error::{GatewayError, GatewayResult};
use crate::http::response::ErrorClassification;
use crate::routing::RouteDefinition;

/// Header carrying the request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Attribute keys written by the built-in filters.
pub mod attributes {
    pub const REQUEST_ID: &str = "request_id";
    pub const PRODUCT_CODE: &str = "product_code";
    pub const PRODUCT_PATH: &str = "product_path";
}

#[derive(Debug)]
enum ClassificationSlot {
    Empty,
    Attached(ErrorClassification),
    Consumed,
}

#[derive(Debug)]
enum ResponseSlot {
    Pending,
    Written(Response),
    Delivered,
}

/// Everything the gateway knows about one in-flight request.
#[derive(Debug)]
pub struct RequestContext {
    request: Request<Body>,
    route: Option<Arc<RouteDefinition>>,
    generation: u64,
    attributes: HashMap<String, String>,
    classification: ClassificationSlot,
    response: ResponseSlot,
    started_at: Instant,
}

impl RequestContext {
    /// Create a context for a request matched against table `generation`.
    pub fn new(request: Request<Body>, generation: u64) -> Self {
        Self {
            request,
            route: None,
            generation,
            attributes: HashMap::new(),
            classification: ClassificationSlot::Empty,
            response: ResponseSlot::Pending,
            started_at: Instant::now(),
        }
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// Route chosen for this request, `None` until matching succeeded.
    pub fn route(&self) -> Option<&Arc<RouteDefinition>> {
        self.route.as_ref()
    }

    pub fn set_route(&mut self, route: Arc<RouteDefinition>) {
        self.route = Some(route);
    }

    /// Generation of the route table this request was matched against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn request_id(&self) -> Option<&str> {
        self.attribute(attributes::REQUEST_ID)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Attach the classification of this request's failure.
    ///
    /// A request fails at most once; a second attach is refused.
    pub fn attach_classification(
        &mut self,
        classification: ErrorClassification,
    ) -> GatewayResult<()> {
        match self.classification {
            ClassificationSlot::Empty => {
                self.classification = ClassificationSlot::Attached(classification);
                Ok(())
            }
            _ => Err(GatewayError::ClassificationAlreadyAttached),
        }
    }

    pub fn classification(&self) -> Option<&ErrorClassification> {
        match &self.classification {
            ClassificationSlot::Attached(c) => Some(c),
            _ => None,
        }
    }

    /// Hand the attached classification to the renderer. Yields it once.
    pub fn take_classification(&mut self) -> Option<ErrorClassification> {
        match std::mem::replace(&mut self.classification, ClassificationSlot::Consumed) {
            ClassificationSlot::Attached(c) => Some(c),
            other => {
                self.classification = other;
                None
            }
        }
    }

    /// True once a response has been written for this request.
    pub fn is_committed(&self) -> bool {
        !matches!(self.response, ResponseSlot::Pending)
    }

    /// Write the response for this request. Only the first write is accepted.
    pub fn write_response(&mut self, response: Response) -> GatewayResult<()> {
        if self.is_committed() {
            return Err(GatewayError::ResponseAlreadyCommitted);
        }
        self.response = ResponseSlot::Written(response);
        Ok(())
    }

    /// Take the written response out for transmission.
    pub fn take_response(&mut self) -> Option<Response> {
        match std::mem::replace(&mut self.response, ResponseSlot::Delivered) {
            ResponseSlot::Written(response) => Some(response),
            ResponseSlot::Pending => {
                self.response = ResponseSlot::Pending;
                None
            }
            ResponseSlot::Delivered => None,
        }
    }
}
