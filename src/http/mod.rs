//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, catch-all handler)
//!     → request.rs (RequestContext: route, attributes, response slot)
//!     → [engine runs the filter chain]
//!     → upstream.rs (forward to the route's target)
//!     → response.rs (classify/render failures into the JSON envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::{ErrorClassification, ErrorTranslator};
pub use server::HttpServer;
pub use upstream::UpstreamDispatcher;
