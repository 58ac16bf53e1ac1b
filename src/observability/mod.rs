//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → whatever metrics recorder the embedding binary installs
//! ```
//!
//! # Design Decisions
//! - Request ID flows through log fields of the access log
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
