// src/watch/watch_set.rs

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::debug;

use crate::fs::{EntryKind, FileSystem};
use crate::watch::event::FsEvent;
use crate::watch::subscription::Subscription;

/// The directories currently registered with a [`Subscription`].
///
/// Only directories are registered; files are observed through the watch on
/// their parent. Directories whose name is in the ignore list are never
/// registered and their subtrees are never entered.
pub struct WatchSet<S: Subscription> {
    subscription: S,
    events: mpsc::UnboundedReceiver<FsEvent>,
    ignored: Vec<String>,
    watched: BTreeSet<PathBuf>,
    closed: bool,
}

impl<S: Subscription> fmt::Debug for WatchSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSet")
            .field("ignored", &self.ignored)
            .field("watched", &self.watched.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<S: Subscription> WatchSet<S> {
    pub fn new(
        subscription: S,
        events: mpsc::UnboundedReceiver<FsEvent>,
        ignored: Vec<String>,
    ) -> Self {
        Self {
            subscription,
            events,
            ignored,
            watched: BTreeSet::new(),
            closed: false,
        }
    }

    /// Whether the final component of `path` is an ignored directory name.
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.ignored.iter().any(|i| i == name))
    }

    /// Register every directory reachable from `root`. Returns how many were
    /// newly registered.
    pub fn initialize(&mut self, root: &Path, fs: &dyn FileSystem) -> usize {
        debug!(?root, "finding directories to watch");
        let added = self.add_tree(root, fs);
        debug!(?root, added, "initial watch set populated");
        added
    }

    /// Register `root` and every directory below it.
    ///
    /// Best effort: a directory that can't be registered or listed is logged
    /// and skipped. Symlinked directories below `root` are not followed.
    pub fn add_tree(&mut self, root: &Path, fs: &dyn FileSystem) -> usize {
        let mut added = 0;
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut stack = vec![root.to_path_buf()];

        while let Some(dir) = stack.pop() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            if self.is_ignored(&dir) {
                debug!(path = ?dir, "ignoring directory and its contents");
                continue;
            }
            if self.add(&dir) {
                added += 1;
            }

            let entries = match fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(path = ?dir, error = %err, "unable to list directory");
                    continue;
                }
            };
            for entry in entries {
                match fs.link_kind(&entry) {
                    Ok(EntryKind::Dir) => stack.push(entry),
                    Ok(_) => {}
                    Err(err) => debug!(path = ?entry, error = %err, "unable to stat entry"),
                }
            }
        }

        added
    }

    /// Register one directory. Returns whether it was newly registered.
    pub fn add(&mut self, path: &Path) -> bool {
        if self.is_ignored(path) {
            debug!(?path, "not watching ignored directory");
            return false;
        }
        if self.watched.contains(path) {
            return false;
        }

        match self.subscription.register(path) {
            Ok(()) => {
                debug!(?path, "added directory to filesystem watcher");
                self.watched.insert(path.to_path_buf());
                true
            }
            Err(err) => {
                debug!(?path, error = %err, "unable to watch directory");
                false
            }
        }
    }

    /// Unregister `path` and every watched directory below it. Returns
    /// whether `path` itself was part of the watch set.
    ///
    /// The OS may already have dropped the watch of a deleted directory, so
    /// an unregister failure is only logged.
    pub fn remove(&mut self, path: &Path) -> bool {
        let was_watched = self.watched.remove(path);
        self.unregister(path);

        let nested: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|dir| dir.starts_with(path))
            .cloned()
            .collect();
        for dir in nested {
            self.watched.remove(&dir);
            self.unregister(&dir);
        }
        was_watched
    }

    fn unregister(&mut self, path: &Path) {
        match self.subscription.unregister(path) {
            Ok(()) => debug!(?path, "removed directory from filesystem watcher"),
            Err(err) => debug!(?path, error = %err, "unable to unwatch path"),
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Watched directories in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.watched.iter().map(PathBuf::as_path)
    }

    /// The stream of events produced by the subscription.
    pub fn events(&mut self) -> &mut mpsc::UnboundedReceiver<FsEvent> {
        &mut self.events
    }

    /// Next event, or `None` once the subscription has gone away.
    pub async fn next_event(&mut self) -> Option<FsEvent> {
        self.events.recv().await
    }

    /// Release the underlying subscription. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        debug!(watched = self.watched.len(), "stopping the filesystem watcher");
        self.subscription.close();
        self.watched.clear();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::errors::{RerunError, Result};
    use crate::fs::mock::MockFileSystem;
    use crate::watch::event::FsOp;

    #[derive(Default)]
    struct Recorder {
        registered: HashSet<PathBuf>,
        refuse: HashSet<PathBuf>,
        closed: bool,
    }

    impl Subscription for Recorder {
        fn register(&mut self, path: &Path) -> Result<()> {
            if self.closed || self.refuse.contains(path) {
                return Err(RerunError::Other(anyhow!("refused {path:?}")));
            }
            self.registered.insert(path.to_path_buf());
            Ok(())
        }

        fn unregister(&mut self, path: &Path) -> Result<()> {
            if self.registered.remove(path) {
                Ok(())
            } else {
                Err(RerunError::Other(anyhow!("not watched {path:?}")))
            }
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn watch_set(recorder: Recorder) -> WatchSet<Recorder> {
        let (_tx, rx) = mpsc::unbounded_channel();
        WatchSet::new(recorder, rx, vec![".git".to_string()])
    }

    fn tree() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/p/README.md");
        fs.add_file("/p/src/main.rs");
        fs.add_file("/p/src/nested/deep/mod.rs");
        fs.add_file("/p/.git/HEAD");
        fs.add_file("/p/.git/refs/heads/main");
        fs.add_dir("/p/empty");
        fs
    }

    #[test]
    fn initialize_registers_every_directory_except_ignored_subtrees() {
        let mut set = watch_set(Recorder::default());
        let added = set.initialize(Path::new("/p"), &tree());

        let watched: Vec<_> = set.paths().map(Path::to_path_buf).collect();
        assert_eq!(
            watched,
            vec![
                PathBuf::from("/p"),
                PathBuf::from("/p/empty"),
                PathBuf::from("/p/src"),
                PathBuf::from("/p/src/nested"),
                PathBuf::from("/p/src/nested/deep"),
            ]
        );
        assert_eq!(added, 5);
    }

    #[test]
    fn registration_failure_does_not_abort_traversal() {
        let mut recorder = Recorder::default();
        recorder.refuse.insert(PathBuf::from("/p/src"));
        let mut set = watch_set(recorder);
        set.initialize(Path::new("/p"), &tree());

        assert!(!set.contains(Path::new("/p/src")));
        assert!(set.contains(Path::new("/p/src/nested/deep")));
    }

    #[test]
    fn symlinked_directories_are_not_followed() {
        let fs = tree();
        fs.add_symlink("/p/loop", "/p");
        let mut set = watch_set(Recorder::default());
        set.initialize(Path::new("/p"), &fs);

        assert!(!set.contains(Path::new("/p/loop")));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn add_refuses_ignored_names_and_duplicates() {
        let mut set = watch_set(Recorder::default());
        assert!(set.add(Path::new("/p/sub")));
        assert!(!set.add(Path::new("/p/sub")));
        assert!(!set.add(Path::new("/p/sub/.git")));
        assert!(!set.contains(Path::new("/p/sub/.git")));
    }

    #[test]
    fn remove_is_tolerant_of_unknown_paths() {
        let mut set = watch_set(Recorder::default());
        set.add(Path::new("/p/sub"));

        assert!(set.remove(Path::new("/p/sub")));
        assert!(!set.contains(Path::new("/p/sub")));
        assert!(!set.remove(Path::new("/p/never-watched")));
    }

    #[test]
    fn remove_drops_nested_directories_so_they_can_be_registered_again() {
        let fs = tree();
        let mut set = watch_set(Recorder::default());
        set.initialize(Path::new("/p"), &fs);

        // `/p/src` moved elsewhere, then a new tree appears at the same path.
        set.remove(Path::new("/p/src"));
        assert!(!set.contains(Path::new("/p/src/nested")));
        assert!(!set.contains(Path::new("/p/src/nested/deep")));
        assert!(!set.subscription.registered.contains(Path::new("/p/src/nested")));

        assert_eq!(set.add_tree(Path::new("/p/src"), &fs), 3);
        assert!(set.subscription.registered.contains(Path::new("/p/src/nested/deep")));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn events_are_delivered_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut set = WatchSet::new(Recorder::default(), rx, Vec::new());

        tx.send(FsEvent::new("/p/a", FsOp::Create)).unwrap();
        tx.send(FsEvent::new("/p/a", FsOp::Write)).unwrap();
        drop(tx);

        let events = set.events();
        assert_eq!(events.try_recv().unwrap().op, FsOp::Create);
        assert_eq!(events.try_recv().unwrap().op, FsOp::Write);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn close_is_idempotent_and_blocks_new_registrations() {
        let mut set = watch_set(Recorder::default());
        set.add(Path::new("/p"));
        set.close();
        set.close();

        assert!(set.is_closed());
        assert!(set.is_empty());
        assert!(!set.add(Path::new("/p/after-close")));
    }
}
