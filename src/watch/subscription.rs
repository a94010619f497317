// src/watch/subscription.rs

//! The OS-level watch primitive behind a [`WatchSet`](super::WatchSet).

use std::fmt;
use std::path::Path;

use anyhow::anyhow;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{RerunError, Result};
use crate::watch::event::{FsEvent, translate};

/// One watch subscription with many registered directories.
///
/// Production uses [`NotifySubscription`]; tests can provide an
/// implementation that only records registrations.
pub trait Subscription: Send {
    /// Start watching `path` (non-recursively).
    fn register(&mut self, path: &Path) -> Result<()>;

    /// Stop watching `path`.
    fn unregister(&mut self, path: &Path) -> Result<()>;

    /// Release the subscription. Later calls to `register` fail.
    fn close(&mut self);
}

/// `notify`-backed subscription.
///
/// Events are translated on notify's own thread and pushed into an unbounded
/// channel; dropping the watcher (via [`Subscription::close`]) ends that
/// stream.
pub struct NotifySubscription {
    watcher: Option<RecommendedWatcher>,
}

impl fmt::Debug for NotifySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifySubscription")
            .field("open", &self.watcher.is_some())
            .finish()
    }
}

impl NotifySubscription {
    /// Create the OS watcher and the receiving end of its event stream.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<FsEvent>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<FsEvent>();

        // Called synchronously by notify whenever an event arrives.
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for fs_event in translate(event) {
                        if event_tx.send(fs_event).is_err() {
                            // Receiver gone; we're shutting down.
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "filesystem watcher error");
                }
            },
            Config::default(),
        )?;

        Ok((
            Self {
                watcher: Some(watcher),
            },
            event_rx,
        ))
    }

    fn watcher(&mut self) -> Result<&mut RecommendedWatcher> {
        self.watcher
            .as_mut()
            .ok_or_else(|| RerunError::Other(anyhow!("watch subscription is closed")))
    }
}

impl Subscription for NotifySubscription {
    fn register(&mut self, path: &Path) -> Result<()> {
        self.watcher()?.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unregister(&mut self, path: &Path) -> Result<()> {
        self.watcher()?.unwatch(path)?;
        Ok(())
    }

    fn close(&mut self) {
        if self.watcher.take().is_some() {
            debug!("notify watcher dropped");
        }
    }
}
