//! Gateway engine.
//!
//! # Data Flow
//! ```text
//! http/server.rs (axum fallback handler)
//!     → gateway.rs GatewayEngine::handle
//!         → routing (read-only table snapshot)
//!         → filter (global + route chain)
//!         → http/upstream.rs (dispatch)
//!         → http/response.rs (translator, on failure)
//! ```
//!
//! # Design Decisions
//! - The engine never writes to the transport itself; it returns one
//!   `Response` built from the request's response slot
//! - Dropping the handler future (client gone) cancels the chain and the
//!   upstream call with it

pub mod gateway;

pub use gateway::GatewayEngine;
