// src/fs/mock.rs

use super::{EntryKind, FileSystem};
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
    Symlink(PathBuf),
}

/// In-memory tree used by tests. Clones share the same tree, so a test can
/// keep a handle and mutate it while the code under test reads it.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert(path.as_ref(), MockEntry::File);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let exists = matches!(
            self.entries.lock().unwrap().get(path),
            Some(MockEntry::Dir(_))
        );
        if !exists {
            self.insert(path, MockEntry::Dir(Vec::new()));
        }
    }

    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        self.insert(path.as_ref(), MockEntry::Symlink(target.into()));
    }

    /// Remove `path` and everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|p, _| !p.starts_with(path));
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
                let name = name.to_string_lossy();
                children.retain(|c| *c != name);
            }
        }
    }

    fn insert(&self, path: &Path, entry: MockEntry) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                Self::ensure_dir_entry(&mut entries, parent);
            }
        }
        entries.insert(path.to_path_buf(), entry);
        Self::link_into_parent(&mut entries, path);
    }

    fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if entries.contains_key(path) {
            return;
        }
        entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = path.parent() {
            // Avoid infinite loop at root
            if !parent.as_os_str().is_empty() && parent != path {
                Self::ensure_dir_entry(entries, parent);
                Self::link_into_parent(entries, path);
            }
        }
    }

    fn link_into_parent(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
            let name = name.to_string_lossy().into_owned();
            if !children.contains(&name) {
                children.push(name);
            }
        }
    }

    fn resolve(&self, path: &Path) -> Result<EntryKind> {
        let entries = self.entries.lock().unwrap();
        let mut current = path.to_path_buf();
        // Bounded so a symlink cycle doesn't spin forever.
        for _ in 0..16 {
            match entries.get(&current) {
                Some(MockEntry::File) => return Ok(EntryKind::File),
                Some(MockEntry::Dir(_)) => return Ok(EntryKind::Dir),
                Some(MockEntry::Symlink(target)) => current = target.clone(),
                None => return Err(anyhow!("No such file or directory: {:?}", path)),
            }
        }
        Err(anyhow!("Too many levels of symbolic links: {:?}", path))
    }
}

impl FileSystem for MockFileSystem {
    fn entry_kind(&self, path: &Path) -> Result<EntryKind> {
        self.resolve(path)
    }

    fn link_kind(&self, path: &Path) -> Result<EntryKind> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File) => Ok(EntryKind::File),
            Some(MockEntry::Dir(_)) => Ok(EntryKind::Dir),
            Some(MockEntry::Symlink(_)) => Ok(EntryKind::Symlink),
            None => Err(anyhow!("No such file or directory: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
