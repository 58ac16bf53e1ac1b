//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route snapshot (from feed)
//!     → reconciler.rs (version check, all-or-nothing compile)
//!     → definition.rs (descriptor → RouteDefinition)
//!     → table.rs (sort by priority, freeze as immutable RouteTable)
//!     → registry.rs (atomic swap, RoutesChanged)
//!
//! Incoming Request (host, path, method, headers)
//!     → registry.current() (table captured once per request)
//!     → table.find() → matcher.rs (evaluate predicates)
//!     → Return: matched RouteDefinition or no-match
//! ```
//!
//! # Design Decisions
//! - Tables are immutable; every update builds a new one
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority, lower first)

pub mod definition;
pub mod matcher;
pub mod reconciler;
pub mod registry;
pub mod table;

pub use definition::{DefinitionError, RouteDefinition, RouteDescriptor, UpstreamTarget};
pub use reconciler::{ReconcileError, Reconciler};
pub use registry::{RouteRegistry, RoutesChanged};
pub use table::RouteTable;
