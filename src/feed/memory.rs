//! In-process config source.
//!
//! Holds the latest published snapshot in a `watch` channel. Embedders push
//! route sets with [`MemorySource::publish`]; tests additionally use it to
//! inject subscribe failures and drop live subscriptions.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::feed::{ConfigSnapshot, ConfigSource, FeedError, FeedKey, Subscription};

#[derive(Debug)]
struct Inner {
    latest: watch::Sender<Option<ConfigSnapshot>>,
    /// Bumped to sever every open subscription.
    epoch: watch::Sender<u64>,
    pending_failures: AtomicUsize,
    subscribes: AtomicUsize,
    last_ack: AtomicU64,
}

/// A [`ConfigSource`] fed from inside the process.
///
/// Serves the same snapshot regardless of the requested key.
#[derive(Debug, Clone)]
pub struct MemorySource {
    inner: Arc<Inner>,
}

impl MemorySource {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        let (epoch, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                latest,
                epoch,
                pending_failures: AtomicUsize::new(0),
                subscribes: AtomicUsize::new(0),
                last_ack: AtomicU64::new(0),
            }),
        }
    }

    /// A source that starts out holding `snapshot`.
    pub fn with_snapshot(snapshot: ConfigSnapshot) -> Self {
        let source = Self::new();
        source.publish(snapshot);
        source
    }

    /// Push a new snapshot to every subscriber.
    pub fn publish(&self, snapshot: ConfigSnapshot) {
        tracing::debug!(version = snapshot.version(), "Publishing in-memory route snapshot");
        self.inner.latest.send_replace(Some(snapshot));
    }

    /// Make the next `count` subscribe calls fail.
    pub fn fail_next_subscribes(&self, count: usize) {
        self.inner.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Sever every open subscription.
    pub fn disconnect_all(&self) {
        self.inner.epoch.send_modify(|epoch| *epoch += 1);
    }

    /// Successful and failed subscribe attempts so far.
    pub fn subscribe_count(&self) -> usize {
        self.inner.subscribes.load(Ordering::SeqCst)
    }

    /// Highest version acknowledged by any subscriber.
    pub fn last_ack(&self) -> u64 {
        self.inner.last_ack.load(Ordering::SeqCst)
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigSource for MemorySource {
    async fn subscribe(&self, key: &FeedKey) -> Result<Box<dyn Subscription>, FeedError> {
        self.inner.subscribes.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .inner
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(FeedError::Rejected(format!("injected failure for {key}")));
        }

        Ok(Box::new(MemorySubscription {
            latest: self.inner.latest.subscribe(),
            epoch: self.inner.epoch.subscribe(),
            primed: false,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MemorySubscription {
    latest: watch::Receiver<Option<ConfigSnapshot>>,
    epoch: watch::Receiver<u64>,
    primed: bool,
    inner: Arc<Inner>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Result<Option<ConfigSnapshot>, FeedError> {
        if !self.primed {
            self.primed = true;
            let current = self.latest.borrow_and_update().clone();
            if current.is_some() {
                return Ok(current);
            }
        }

        loop {
            tokio::select! {
                changed = self.latest.changed() => {
                    if changed.is_err() {
                        return Ok(None);
                    }
                    let current = self.latest.borrow_and_update().clone();
                    if current.is_some() {
                        return Ok(current);
                    }
                }
                changed = self.epoch.changed() => {
                    if changed.is_err() {
                        return Ok(None);
                    }
                    return Err(FeedError::Disconnected);
                }
            }
        }
    }

    async fn ack(&mut self, version: u64) -> Result<(), FeedError> {
        self.inner.last_ack.fetch_max(version, Ordering::SeqCst);
        Ok(())
    }
}
