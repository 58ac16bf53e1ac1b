//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Config feed subscription lost or refused:
//!     → backoff.rs (exponential delay with jitter, capped)
//!     → resubscribe
//!
//! Upstream dispatch:
//!     → bounded by connect and request timeouts in http/upstream.rs
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Requests are never retried; a failed dispatch is classified and answered
//! - Jittered backoff prevents reconnect storms against the config source

pub mod backoff;
