//! Error translation: failure → single JSON envelope.
//!
//! # Responsibilities
//! - Classify any [`GatewayError`] into an [`ErrorClassification`]
//! - Render the classification as `{"code": .., "message": ..}`
//! - Write the rendered response through the request's response slot
//!
//! # Classification (first match wins)
//! ```text
//! RouteNotFound           → 404, code 404, "Service Not Found"
//! Status / Upstream*      → declared status, code 500, failure message
//! Business                → 200, failure's code and message
//! anything else           → 500, SERVER_ERROR_CODE, "Internal Server Error"
//! ```
//!
//! # Design Decisions
//! - Classify and render are separate steps; the classification crosses
//!   between them inside the [`RequestContext`]
//! - If a response was already written, nothing is written again and the
//!   original failure is handed back to the caller

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::error::{GatewayError, GatewayResult};
use crate::http::request::{RequestContext, X_REQUEST_ID};

/// Application code for unclassified server errors.
pub const SERVER_ERROR_CODE: i32 = 500;
/// Application code for explicit HTTP-status failures.
pub const HTTP_STATUS_ERROR_CODE: i32 = 500;
/// Application code for requests no route accepts.
pub const ROUTE_NOT_FOUND_CODE: i32 = 404;

pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Service Not Found";
pub const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Internal Server Error";

const JSON_UTF8: &str = "application/json;charset=UTF-8";

/// HTTP status, application code and message for one failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    code: i32,
    message: &'a str,
}

/// Map a failure onto its client-visible classification.
pub fn classify(error: &GatewayError) -> ErrorClassification {
    match error {
        GatewayError::RouteNotFound { .. } => ErrorClassification {
            status: StatusCode::NOT_FOUND,
            code: ROUTE_NOT_FOUND_CODE,
            message: ROUTE_NOT_FOUND_MESSAGE.to_string(),
        },
        GatewayError::Status { status, message } => ErrorClassification {
            status: *status,
            code: HTTP_STATUS_ERROR_CODE,
            message: message.clone(),
        },
        GatewayError::Upstream { .. } => ErrorClassification {
            status: StatusCode::BAD_GATEWAY,
            code: HTTP_STATUS_ERROR_CODE,
            message: "Bad Gateway".to_string(),
        },
        GatewayError::UpstreamTimeout { .. } => ErrorClassification {
            status: StatusCode::GATEWAY_TIMEOUT,
            code: HTTP_STATUS_ERROR_CODE,
            message: "Gateway Timeout".to_string(),
        },
        GatewayError::Business { code, message } => ErrorClassification {
            status: StatusCode::OK,
            code: *code,
            message: message.clone(),
        },
        _ => internal_error(),
    }
}

fn internal_error() -> ErrorClassification {
    ErrorClassification {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: SERVER_ERROR_CODE,
        message: INTERNAL_SERVER_ERROR_MESSAGE.to_string(),
    }
}

/// Render the classification attached to `ctx`, consuming it.
pub fn render(ctx: &mut RequestContext) -> GatewayResult<Response> {
    let classification = ctx
        .take_classification()
        .ok_or_else(|| GatewayError::Internal("no error classification attached".into()))?;

    let mut response = envelope(&classification)?;
    if let Some(request_id) = ctx.request_id() {
        if let Ok(value) = header::HeaderValue::from_str(request_id) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
    }
    Ok(response)
}

/// Response used when the pipeline ended without writing anything.
pub fn fallback_response() -> Response {
    let classification = internal_error();
    envelope(&classification).unwrap_or_else(|_| {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

fn envelope(classification: &ErrorClassification) -> GatewayResult<Response> {
    let body = serde_json::to_vec(&ErrorEnvelope {
        code: classification.code,
        message: &classification.message,
    })
    .map_err(|e| GatewayError::Internal(format!("envelope serialization failed: {e}")))?;

    Response::builder()
        .status(classification.status)
        .header(header::CONTENT_TYPE, JSON_UTF8)
        .body(Body::from(body))
        .map_err(|e| GatewayError::Internal(format!("envelope build failed: {e}")))
}

/// Turns pipeline failures into the one response a request receives.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorTranslator;

impl ErrorTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Classify `error`, render it and write it to `ctx`.
    ///
    /// When `ctx` already carries a written response the failure is returned
    /// unchanged and nothing is written.
    pub fn handle(&self, ctx: &mut RequestContext, error: GatewayError) -> GatewayResult<()> {
        if ctx.is_committed() {
            tracing::error!(
                request_id = ctx.request_id().unwrap_or("-"),
                path = %ctx.path(),
                error = %error,
                "Failure raised after the response was committed; not writing again"
            );
            return Err(error);
        }

        let classification = classify(&error);
        if classification.status.is_server_error() {
            tracing::error!(
                request_id = ctx.request_id().unwrap_or("-"),
                path = %ctx.path(),
                status = classification.status.as_u16(),
                error = %error,
                "Gateway exception"
            );
        } else {
            tracing::warn!(
                request_id = ctx.request_id().unwrap_or("-"),
                path = %ctx.path(),
                status = classification.status.as_u16(),
                error = %error,
                "Gateway exception"
            );
        }

        ctx.attach_classification(classification)?;
        let response = render(ctx)?;
        ctx.write_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::time::Duration;

    fn context() -> RequestContext {
        let request = Request::builder()
            .uri("/orders/list")
            .body(Body::empty())
            .unwrap();
        RequestContext::new(request, 1)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_classification_table() {
        let not_found = classify(&GatewayError::RouteNotFound { path: "/x".into() });
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.code, 404);
        assert_eq!(not_found.message, "Service Not Found");

        let status = classify(&GatewayError::status(StatusCode::BAD_REQUEST, "Invalid request path"));
        assert_eq!(status.status, StatusCode::BAD_REQUEST);
        assert_eq!(status.code, 500);
        assert_eq!(status.message, "Invalid request path");

        let business = classify(&GatewayError::business(40012, "quota exhausted"));
        assert_eq!(business.status, StatusCode::OK);
        assert_eq!(business.code, 40012);
        assert_eq!(business.message, "quota exhausted");

        let internal = classify(&GatewayError::Internal("boom".into()));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.code, SERVER_ERROR_CODE);
        assert_eq!(internal.message, "Internal Server Error");
    }

    #[test]
    fn test_upstream_failures_carry_gateway_statuses() {
        let refused = classify(&GatewayError::Upstream {
            target: "http://upstream:8080".into(),
            reason: "connection refused".into(),
        });
        assert_eq!(refused.status, StatusCode::BAD_GATEWAY);
        assert_eq!(refused.code, 500);

        let timeout = classify(&GatewayError::UpstreamTimeout {
            target: "http://upstream:8080".into(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.code, 500);
    }

    #[tokio::test]
    async fn test_route_not_found_envelope() {
        let mut ctx = context();
        ErrorTranslator::new()
            .handle(&mut ctx, GatewayError::RouteNotFound { path: "/orders/list".into() })
            .unwrap();

        let response = ctx.take_response().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json;charset=UTF-8"
        );
        assert_eq!(
            body_string(response).await,
            r#"{"code":404,"message":"Service Not Found"}"#
        );
    }

    #[tokio::test]
    async fn test_message_is_json_escaped() {
        let mut ctx = context();
        ErrorTranslator::new()
            .handle(&mut ctx, GatewayError::business(7, "bad \"quote\""))
            .unwrap();

        let response = ctx.take_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["code"], 7);
        assert_eq!(body["message"], "bad \"quote\"");
    }

    #[tokio::test]
    async fn test_committed_response_is_not_overwritten() {
        let mut ctx = context();
        ctx.write_response(Response::new(Body::from("upstream bytes")))
            .unwrap();

        let err = ErrorTranslator::new()
            .handle(&mut ctx, GatewayError::business(1, "late"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Business { code: 1, .. }));
        assert!(ctx.classification().is_none());

        let response = ctx.take_response().unwrap();
        assert_eq!(body_string(response).await, "upstream bytes");
    }

    #[tokio::test]
    async fn test_request_id_echoed_on_envelope() {
        let mut ctx = context();
        ctx.set_attribute(crate::http::request::attributes::REQUEST_ID, "req-42");
        ErrorTranslator::new()
            .handle(&mut ctx, GatewayError::Internal("oops".into()))
            .unwrap();
        let response = ctx.take_response().unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "req-42");
    }

    #[test]
    fn test_render_without_classification_fails() {
        let mut ctx = context();
        assert!(matches!(render(&mut ctx), Err(GatewayError::Internal(_))));
    }

    #[tokio::test]
    async fn test_fallback_response_is_internal_envelope() {
        let response = fallback_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            r#"{"code":500,"message":"Internal Server Error"}"#
        );
    }
}
