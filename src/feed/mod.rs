//! Config feed subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigSource (file.rs / memory.rs / any remote store)
//!     → subscribe(FeedKey{namespace, group}) → Subscription
//!     → client.rs pumps snapshots: next() → Reconciler::apply_snapshot → ack()
//!     → on disconnect/timeout: backoff, resubscribe, skip already-applied versions
//! ```
//!
//! # Design Decisions
//! - Every delivery is a full snapshot, never a delta
//! - Sources only transport snapshots; ordering and dedupe live in the client
//! - Empty or absent config is a valid snapshot with zero routes

pub mod client;
pub mod file;
pub mod memory;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use client::ConfigFeedClient;
pub use file::FileSource;
pub use memory::MemorySource;

/// Raw route payload plus the version it was published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    version: u64,
    content: String,
}

impl ConfigSnapshot {
    pub fn new(version: u64, content: impl Into<String>) -> Self {
        Self {
            version,
            content: content.into(),
        }
    }

    /// A snapshot with no routes.
    pub fn empty(version: u64) -> Self {
        Self::new(version, "[]")
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// True when the payload carries no descriptors at all.
    pub fn is_empty(&self) -> bool {
        let trimmed = self.content.trim();
        trimmed.is_empty() || trimmed == "null" || trimmed == "[]"
    }
}

/// Identifies one route set at the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub namespace: String,
    pub group: String,
}

impl FeedKey {
    pub fn new(namespace: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            group: group.into(),
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.group)
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("config feed call timed out after {0:?}")]
    Timeout(Duration),

    #[error("config feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config feed watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("config feed disconnected")]
    Disconnected,

    #[error("config feed refused the subscription: {0}")]
    Rejected(String),
}

/// A push-capable source of route snapshots.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn subscribe(&self, key: &FeedKey) -> Result<Box<dyn Subscription>, FeedError>;
}

/// One live subscription.
///
/// The first call to [`Subscription::next`] yields the current snapshot;
/// later calls wait for changes.
#[async_trait]
pub trait Subscription: Send {
    /// `Ok(None)` means the source closed the subscription.
    async fn next(&mut self) -> Result<Option<ConfigSnapshot>, FeedError>;

    /// Acknowledge that `version` was received.
    async fn ack(&mut self, _version: u64) -> Result<(), FeedError> {
        Ok(())
    }
}
