//! Request-path error taxonomy.
//!
//! Every failure raised while matching, filtering or dispatching a request is a
//! [`GatewayError`]. None of these reach the transport directly: the engine
//! hands them to the error translator in [`crate::http::response`], which turns
//! each into exactly one JSON envelope.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

/// Failures surfaced on the per-request path.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route in the active table matched the request.
    #[error("no route matched path {path}")]
    RouteNotFound { path: String },

    /// Failure that declares its own HTTP status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// Application-level rule violation, reported in-band with HTTP 200.
    #[error("business rule failure {code}: {message}")]
    Business { code: i32, message: String },

    /// Upstream could not be reached or broke mid-exchange.
    #[error("upstream {target} failed: {reason}")]
    Upstream { target: String, reason: String },

    /// Upstream did not answer within the dispatch deadline.
    #[error("upstream {target} timed out after {timeout:?}")]
    UpstreamTimeout { target: String, timeout: Duration },

    /// A response was already written for this request.
    #[error("response already committed")]
    ResponseAlreadyCommitted,

    /// A classification was already attached to this request.
    #[error("error classification already attached")]
    ClassificationAlreadyAttached,

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a failure carrying an explicit HTTP status.
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Shorthand for a business-rule failure.
    pub fn business(code: i32, message: impl Into<String>) -> Self {
        Self::Business {
            code,
            message: message.into(),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
