//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → registry/reconciler/engine → feed client → listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger → feed client exits, server stops accepting and drains
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - One shutdown coordinator shared by every background task

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{start, GatewayHandle, StartupError};
