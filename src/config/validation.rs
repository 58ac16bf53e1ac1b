//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check a parsed configuration for values serde cannot reject on its own.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let feed = &config.feed;
    if feed.namespace.trim().is_empty() {
        errors.push(ValidationError::new("feed.namespace", "must not be empty"));
    }
    if feed.group.trim().is_empty() {
        errors.push(ValidationError::new("feed.group", "must not be empty"));
    }
    if feed.request_timeout_ms == 0 {
        errors.push(ValidationError::new("feed.request_timeout_ms", "must be > 0"));
    }
    if feed.reconnect_base_delay_ms == 0 {
        errors.push(ValidationError::new("feed.reconnect_base_delay_ms", "must be > 0"));
    } else if feed.reconnect_base_delay_ms > feed.reconnect_max_delay_ms {
        errors.push(ValidationError::new(
            "feed.reconnect_base_delay_ms",
            "must not exceed reconnect_max_delay_ms",
        ));
    }

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.connect_timeout_secs", "must be > 0"));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.request_timeout_secs", "must be > 0"));
    }

    if config.filters.product_code_min_segments < 2 {
        errors.push(ValidationError::new(
            "filters.product_code_min_segments",
            "must be at least 2 (service prefix and product code)",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.feed.namespace = " ".into();
        config.upstream.request_timeout_secs = 0;
        config.feed.reconnect_base_delay_ms = 60_000;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "feed.namespace",
                "feed.reconnect_base_delay_ms",
                "upstream.request_timeout_secs",
            ]
        );
    }

    #[test]
    fn test_rejects_zero_reconnect_delay() {
        let mut config = GatewayConfig::default();
        config.feed.reconnect_base_delay_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "feed.reconnect_base_delay_ms");
        assert_eq!(errors[0].reason, "must be > 0");
    }
}
