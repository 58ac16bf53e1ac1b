//! Edge gateway core: dynamic route registry fed by a push config source,
//! and a filter pipeline that answers every request exactly once.

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use engine::GatewayEngine;
pub use error::{GatewayError, GatewayResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
