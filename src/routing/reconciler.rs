//! Applies config feed snapshots to the route registry.
//!
//! # Flow
//! ```text
//! ConfigSnapshot
//!     → version check against the active table (stale → discard)
//!     → parse every descriptor (any failure → reject whole snapshot)
//!     → build a brand-new RouteTable (generation + 1)
//!     → RouteRegistry::publish (single atomic swap + RoutesChanged)
//! ```
//!
//! At most one reconciliation runs at a time; concurrent callers queue on
//! the write lock.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::feed::ConfigSnapshot;
use crate::observability::metrics;
use crate::routing::definition::{RouteDefinition, RouteDescriptor};
use crate::routing::registry::RouteRegistry;
use crate::routing::table::RouteTable;

/// Why a snapshot was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The snapshot is not newer than the active table.
    #[error("snapshot version {offered} is not newer than active version {active}")]
    Stale { offered: u64, active: u64 },

    /// At least one descriptor could not be compiled; nothing was applied.
    #[error("snapshot version {version} rejected: {reason}")]
    ParseFailure { version: u64, reason: String },
}

/// Sole writer of the [`RouteRegistry`].
#[derive(Debug)]
pub struct Reconciler {
    registry: Arc<RouteRegistry>,
    write_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(registry: Arc<RouteRegistry>) -> Self {
        Self {
            registry,
            write_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    /// Replace the active table with one built from `snapshot`.
    ///
    /// Returns the generation of the published table.
    pub async fn apply_snapshot(&self, snapshot: ConfigSnapshot) -> Result<u64, ReconcileError> {
        let _guard = self.write_lock.lock().await;

        let active = self.registry.current();
        let version = snapshot.version();

        if let Some(active_version) = active.version() {
            if version <= active_version {
                tracing::warn!(
                    offered = version,
                    active = active_version,
                    "Discarding stale route snapshot"
                );
                metrics::record_reconcile("stale");
                return Err(ReconcileError::Stale {
                    offered: version,
                    active: active_version,
                });
            }
        }

        let table = match compile(active.generation() + 1, &snapshot) {
            Ok(table) => table,
            Err(reason) => {
                tracing::error!(
                    version,
                    generation = active.generation(),
                    reason = %reason,
                    "Route snapshot rejected; keeping current routes"
                );
                metrics::record_reconcile("parse_failure");
                return Err(ReconcileError::ParseFailure { version, reason });
            }
        };

        let previous = active.len();
        let event = self.registry.publish(table);
        metrics::record_reconcile("applied");
        tracing::info!(
            version,
            generation = event.generation,
            previous_routes = previous,
            routes = event.route_count,
            "Route table published"
        );

        Ok(event.generation)
    }
}

fn compile(generation: u64, snapshot: &ConfigSnapshot) -> Result<RouteTable, String> {
    let descriptors = RouteDescriptor::parse_list(snapshot.content()).map_err(|e| e.to_string())?;

    let definitions = descriptors
        .iter()
        .enumerate()
        .map(|(i, d)| {
            RouteDefinition::from_descriptor(d)
                .map_err(|e| format!("route #{i} ('{}'): {e}", d.id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    RouteTable::build(generation, Some(snapshot.version()), definitions).map_err(|e| e.to_string())
}
