use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::mpsc;
use rerun::errors::{RerunError, Result};
use rerun::watch::{FsEvent, FsOp, Subscription, WatchSet};

#[derive(Debug, Default)]
struct SubscriptionState {
    registered: BTreeSet<PathBuf>,
    register_calls: Vec<PathBuf>,
    refused: HashSet<PathBuf>,
    unregistered: Vec<PathBuf>,
    closed: bool,
}

/// A subscription that only records registrations.
#[derive(Debug, Clone, Default)]
pub struct FakeSubscription {
    state: Arc<Mutex<SubscriptionState>>,
}

impl Subscription for FakeSubscription {
    fn register(&mut self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(RerunError::Other(anyhow!("subscription closed")));
        }
        if state.refused.contains(path) {
            return Err(RerunError::Other(anyhow!("permission denied: {path:?}")));
        }
        state.register_calls.push(path.to_path_buf());
        state.registered.insert(path.to_path_buf());
        Ok(())
    }

    fn unregister(&mut self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.unregistered.push(path.to_path_buf());
        if state.registered.remove(path) {
            Ok(())
        } else {
            Err(RerunError::Other(anyhow!("not watched: {path:?}")))
        }
    }

    fn close(&mut self) {
        self.state.lock().unwrap().closed = true;
    }
}

/// Test-side handle onto a [`FakeSubscription`] and its event stream.
#[derive(Debug, Clone)]
pub struct FakeWatch {
    state: Arc<Mutex<SubscriptionState>>,
    events_tx: mpsc::UnboundedSender<FsEvent>,
}

impl FakeWatch {
    /// Inject an event as if the OS had reported it.
    pub fn emit(&self, path: impl Into<PathBuf>, op: FsOp) {
        self.events_tx
            .send(FsEvent::new(path, op))
            .expect("watch set dropped its event receiver");
    }

    /// Paths currently registered with the subscription.
    pub fn registered(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().registered.iter().cloned().collect()
    }

    pub fn is_registered(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().unwrap().registered.contains(path.as_ref())
    }

    /// Every path successfully registered, in order, including repeats.
    pub fn register_calls(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().register_calls.clone()
    }

    /// Every path `unregister` was called with, in order.
    pub fn unregister_calls(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().unregistered.clone()
    }

    /// Make future registrations of `path` fail.
    pub fn refuse(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().refused.insert(path.into());
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

/// Build a watch set over a [`FakeSubscription`] plus the handle that drives it.
pub fn fake_watch_set(ignored: &[&str]) -> (WatchSet<FakeSubscription>, FakeWatch) {
    let subscription = FakeSubscription::default();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let handle = FakeWatch {
        state: Arc::clone(&subscription.state),
        events_tx,
    };
    let ignored = ignored.iter().map(|s| s.to_string()).collect();
    (WatchSet::new(subscription, events_rx, ignored), handle)
}
