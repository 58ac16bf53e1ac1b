//! File-backed config source.
//!
//! # Responsibilities
//! - Serve `<root>/<namespace>/<group>.json` as the route snapshot
//! - Watch the namespace directory and push a new snapshot on change
//!
//! # Design Decisions
//! - Version is the file's mtime in milliseconds, bumped past the last
//!   delivered version when coarse timestamps would not advance
//! - Events only trigger a re-read; unchanged content is not re-delivered
//! - An absent file is an empty route set, not an error; it is versioned by
//!   the wall clock so a removal is seen as newer by a fresh subscription

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::feed::{ConfigSnapshot, ConfigSource, FeedError, FeedKey, Subscription};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Serves route snapshots from JSON files on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of the route file for `key`.
    pub fn path_for(&self, key: &FeedKey) -> PathBuf {
        self.root
            .join(&key.namespace)
            .join(format!("{}.json", key.group))
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    async fn subscribe(&self, key: &FeedKey) -> Result<Box<dyn Subscription>, FeedError> {
        let path = self.path_for(key);
        let dir = self.root.join(&key.namespace);
        tokio::fs::create_dir_all(&dir).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let watched = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.paths.iter().any(|p| p.file_name() == watched.file_name()) {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Route file watch error"),
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Watching route file");
        Ok(Box::new(FileSubscription {
            path,
            events: rx,
            _watcher: watcher,
            primed: false,
            last_content: None,
            last_version: None,
        }))
    }
}

struct FileSubscription {
    path: PathBuf,
    events: mpsc::UnboundedReceiver<()>,
    _watcher: RecommendedWatcher,
    primed: bool,
    last_content: Option<String>,
    last_version: Option<u64>,
}

impl FileSubscription {
    /// Read the file, returning `None` when the content is unchanged.
    async fn read(&mut self) -> Result<Option<ConfigSnapshot>, FeedError> {
        let (content, mtime_ms) = read_route_file(&self.path).await?;
        if self.last_content.as_deref() == Some(content.as_str()) {
            return Ok(None);
        }

        let version = match self.last_version {
            Some(last) if mtime_ms <= last => last + 1,
            _ => mtime_ms,
        };
        self.last_version = Some(version);
        self.last_content = Some(content.clone());
        Ok(Some(ConfigSnapshot::new(version, content)))
    }
}

#[async_trait]
impl Subscription for FileSubscription {
    async fn next(&mut self) -> Result<Option<ConfigSnapshot>, FeedError> {
        if !self.primed {
            self.primed = true;
            if let Some(snapshot) = self.read().await? {
                return Ok(Some(snapshot));
            }
        }

        loop {
            if self.events.recv().await.is_none() {
                return Ok(None);
            }
            // Coalesce bursts from a single save.
            while self.events.try_recv().is_ok() {}

            if let Some(snapshot) = self.read().await? {
                tracing::info!(
                    path = %self.path.display(),
                    version = snapshot.version(),
                    "Route file changed"
                );
                return Ok(Some(snapshot));
            }
        }
    }
}

fn epoch_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Content and mtime (ms) of the route file; an absent file reads as `[]`
/// stamped with the current time.
async fn read_route_file(path: &Path) -> Result<(String, u64), FeedError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let modified = tokio::fs::metadata(path).await?.modified()?;
            Ok((content, epoch_ms(modified)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(("[]".to_string(), epoch_ms(SystemTime::now()))),
        Err(e) => Err(e.into()),
    }
}
