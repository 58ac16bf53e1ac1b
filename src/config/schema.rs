//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.
//! Route definitions are not part of this file: they arrive through the
//! config feed at runtime.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route feed subscription settings.
    pub feed: FeedConfig,

    /// Upstream dispatch settings.
    pub upstream: UpstreamConfig,

    /// Global filter toggles.
    pub filters: FiltersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Route feed subscription configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Namespace (data id) the route set is published under.
    pub namespace: String,

    /// Group the route set is published under.
    pub group: String,

    /// Root directory of the file-backed source.
    pub root_dir: String,

    /// Bounded wait for subscribe/ack calls, in milliseconds.
    pub request_timeout_ms: u64,

    /// Base delay for reconnect backoff in milliseconds.
    pub reconnect_base_delay_ms: u64,

    /// Maximum delay for reconnect backoff in milliseconds.
    pub reconnect_max_delay_ms: u64,
}

impl FeedConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            namespace: "cyber-cloud-gateway-router".to_string(),
            group: "CLOUD_GATEWAY".to_string(),
            root_dir: "./routes".to_string(),
            request_timeout_ms: 5000,
            reconnect_base_delay_ms: 500,
            reconnect_max_delay_ms: 30_000,
        }
    }
}

/// Upstream dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Whole-exchange timeout (until response headers) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

/// Global filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Assign/propagate `x-request-id`.
    pub request_id: bool,

    /// Log one line per completed request.
    pub access_log: bool,

    /// Extract the product code segment from every routed path.
    pub product_code: bool,

    /// Minimum number of path segments the product code filter accepts.
    pub product_code_min_segments: usize,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            request_id: true,
            access_log: true,
            product_code: false,
            product_code_min_segments: 3,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
