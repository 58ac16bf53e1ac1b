//! Metrics collection.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, route table, feed health)
//! - Record through the `metrics` facade; the binary decides whether an
//!   exporter is installed
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_route_count` (gauge): routes in the active table
//! - `gateway_reconcile_total` (counter): snapshot applications by outcome
//! - `gateway_feed_reconnects_total` (counter): config feed resubscriptions
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Unmatched requests are labelled `route="none"`

use std::time::Instant;

use ::metrics::{counter, gauge, histogram};

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let status = status.to_string();
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.clone(),
        "route" => route.to_string()
    )
    .increment(1);
    histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status,
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_route_count(count: usize) {
    gauge!("gateway_route_count").set(count as f64);
}

/// `outcome` is one of `applied`, `stale`, `parse_failure`.
pub fn record_reconcile(outcome: &'static str) {
    counter!("gateway_reconcile_total", "outcome" => outcome).increment(1);
}

pub fn record_feed_reconnect() {
    counter!("gateway_feed_reconnects_total").increment(1);
}
