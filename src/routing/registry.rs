//! Process-wide holder of the active route table.
//!
//! Readers take an `Arc<RouteTable>` once per request and keep it for the
//! whole request. Publishing replaces the pointer in one atomic store, so a
//! reader sees either the old table or the new one, never a mix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;

use crate::observability::metrics;
use crate::routing::table::RouteTable;

/// Emitted after a new table has been published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutesChanged {
    pub generation: u64,
    pub version: Option<u64>,
    pub route_count: usize,
}

/// Lock-free access to the current [`RouteTable`].
#[derive(Debug)]
pub struct RouteRegistry {
    current: ArcSwap<RouteTable>,
    changes: broadcast::Sender<RoutesChanged>,
}

impl RouteRegistry {
    /// Start with an empty table at generation 0.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            current: ArcSwap::from_pointee(RouteTable::empty()),
            changes,
        }
    }

    /// Snapshot of the active table.
    pub fn current(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// Receive a [`RoutesChanged`] for every publish after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RoutesChanged> {
        self.changes.subscribe()
    }

    /// Swap in `table`. Callers serialise publishes (see `Reconciler`).
    pub(crate) fn publish(&self, table: RouteTable) -> RoutesChanged {
        let event = RoutesChanged {
            generation: table.generation(),
            version: table.version(),
            route_count: table.len(),
        };
        self.current.store(Arc::new(table));
        metrics::record_route_count(event.route_count);
        // No subscribers is fine.
        let _ = self.changes.send(event);
        event
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
