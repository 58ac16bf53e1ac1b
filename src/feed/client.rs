//! Long-lived subscription that keeps the route registry in sync.
//!
//! # Responsibilities
//! - Subscribe to the source under `(namespace, group)` with a bounded wait
//! - Hand every new snapshot to the [`Reconciler`], then acknowledge it
//! - Resubscribe with jittered exponential backoff when the feed drops
//! - Never deliver a version that was already delivered, across reconnects
//!
//! # Design Decisions
//! - Feed outages never touch the registry; the last good table keeps serving
//! - A rejected snapshot still counts as delivered; only a newer push fixes it
//! - Shutdown interrupts both an active session and a backoff sleep

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::config::FeedConfig;
use crate::feed::{ConfigSnapshot, ConfigSource, FeedError, FeedKey};
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::routing::{ReconcileError, Reconciler};

/// How a subscription session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Never got a subscription.
    SubscribeFailed(FeedError),
    /// Subscribed, then the feed failed. `received` is false when the
    /// session never yielded a snapshot.
    Lost { error: FeedError, received: bool },
    /// Subscribed, then the source closed the stream.
    Closed { received: bool },
}

impl SessionEnd {
    /// Next backoff attempt: a session that produced a snapshot starts the
    /// schedule over, anything else keeps growing the delay.
    fn next_attempt(&self, attempt: u32) -> u32 {
        match self {
            SessionEnd::Lost { received: true, .. } | SessionEnd::Closed { received: true } => 1,
            _ => attempt.saturating_add(1),
        }
    }
}

/// Pumps snapshots from a [`ConfigSource`] into the [`Reconciler`].
pub struct ConfigFeedClient {
    source: Arc<dyn ConfigSource>,
    key: FeedKey,
    reconciler: Arc<Reconciler>,
    request_timeout: Duration,
    base_delay_ms: u64,
    max_delay_ms: u64,
    last_delivered: Option<u64>,
}

impl ConfigFeedClient {
    pub fn new(source: Arc<dyn ConfigSource>, reconciler: Arc<Reconciler>, config: &FeedConfig) -> Self {
        Self {
            source,
            key: FeedKey::new(config.namespace.clone(), config.group.clone()),
            reconciler,
            request_timeout: config.request_timeout(),
            base_delay_ms: config.reconnect_base_delay_ms,
            max_delay_ms: config.reconnect_max_delay_ms,
            last_delivered: None,
        }
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    /// Highest snapshot version handed to the reconciler so far.
    pub fn last_delivered(&self) -> Option<u64> {
        self.last_delivered
    }

    /// Run until `shutdown` fires.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms);
                tracing::info!(key = %self.key, attempt, delay = ?delay, "Reconnecting to config feed");
                metrics::record_feed_reconnect();
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let end = tokio::select! {
                _ = shutdown.recv() => break,
                end = self.session() => end,
            };

            match &end {
                SessionEnd::SubscribeFailed(e) => {
                    tracing::warn!(key = %self.key, error = %e, "Config feed subscribe failed");
                }
                SessionEnd::Lost { error, .. } => {
                    tracing::warn!(key = %self.key, error = %error, "Config feed connection lost; serving last known routes");
                }
                SessionEnd::Closed { .. } => {
                    tracing::warn!(key = %self.key, "Config feed closed the subscription");
                }
            }
            attempt = end.next_attempt(attempt);
        }

        tracing::info!(key = %self.key, "Config feed client stopped");
    }

    async fn session(&mut self) -> SessionEnd {
        let subscribed = timeout(self.request_timeout, self.source.subscribe(&self.key)).await;
        let mut subscription = match subscribed {
            Ok(Ok(subscription)) => subscription,
            Ok(Err(e)) => return SessionEnd::SubscribeFailed(e),
            Err(_) => return SessionEnd::SubscribeFailed(FeedError::Timeout(self.request_timeout)),
        };
        tracing::info!(key = %self.key, "Subscribed to config feed");
        let mut received = false;

        loop {
            let snapshot = match subscription.next().await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => return SessionEnd::Closed { received },
                Err(error) => return SessionEnd::Lost { error, received },
            };
            received = true;
            let version = snapshot.version();
            self.deliver(snapshot).await;

            match timeout(self.request_timeout, subscription.ack(version)).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => return SessionEnd::Lost { error, received },
                Err(_) => {
                    return SessionEnd::Lost {
                        error: FeedError::Timeout(self.request_timeout),
                        received,
                    }
                }
            }
        }
    }

    async fn deliver(&mut self, snapshot: ConfigSnapshot) {
        let version = snapshot.version();
        if let Some(last) = self.last_delivered {
            if version <= last {
                tracing::debug!(key = %self.key, version, last, "Skipping already delivered snapshot");
                return;
            }
        }
        self.last_delivered = Some(version);

        match self.reconciler.apply_snapshot(snapshot).await {
            Ok(generation) => {
                tracing::debug!(key = %self.key, version, generation, "Snapshot applied");
            }
            Err(ReconcileError::Stale { .. }) | Err(ReconcileError::ParseFailure { .. }) => {
                // Already logged by the reconciler.
            }
        }
    }
}
