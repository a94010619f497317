// src/watch/event.rs

//! Filesystem events as the controller sees them.

use std::fmt;
use std::path::PathBuf;

use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// Kind of change reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsOp::Create => "CREATE",
            FsOp::Write => "WRITE",
            FsOp::Remove => "REMOVE",
            FsOp::Rename => "RENAME",
            FsOp::Chmod => "CHMOD",
        };
        f.write_str(name)
    }
}

/// A single change notification for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: FsOp,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: FsOp) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

impl fmt::Display for FsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.op, self.path)
    }
}

/// Translate a `notify` event into zero or more [`FsEvent`]s, one per path.
///
/// Access notifications are dropped. For renames, the old name is reported as
/// `Rename` and the new name as `Create`; the combined "both" notification
/// some backends emit in addition is dropped so a rename is not counted twice.
pub fn translate(event: notify::Event) -> Vec<FsEvent> {
    let Some(op) = op_for(&event.kind) else {
        return Vec::new();
    };
    event
        .paths
        .into_iter()
        .map(|path| FsEvent { path, op })
        .collect()
}

fn op_for(kind: &EventKind) -> Option<FsOp> {
    match kind {
        EventKind::Create(_) => Some(FsOp::Create),
        EventKind::Remove(_) => Some(FsOp::Remove),
        EventKind::Modify(ModifyKind::Metadata(_)) => Some(FsOp::Chmod),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(FsOp::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
        EventKind::Modify(ModifyKind::Name(_)) => Some(FsOp::Rename),
        EventKind::Modify(_) | EventKind::Any => Some(FsOp::Write),
        EventKind::Access(_) | EventKind::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    use super::*;

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut ev = notify::Event::new(kind);
        for p in paths {
            ev = ev.add_path(PathBuf::from(p));
        }
        ev
    }

    #[test]
    fn maps_basic_kinds() {
        let cases = [
            (EventKind::Create(CreateKind::Folder), FsOp::Create),
            (EventKind::Remove(RemoveKind::File), FsOp::Remove),
            (
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                FsOp::Write,
            ),
            (
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                FsOp::Chmod,
            ),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::From)),
                FsOp::Rename,
            ),
            (
                EventKind::Modify(ModifyKind::Name(RenameMode::To)),
                FsOp::Create,
            ),
        ];
        for (kind, op) in cases {
            assert_eq!(
                translate(event(kind, &["/w/a"])),
                vec![FsEvent::new("/w/a", op)],
                "{kind:?}"
            );
        }
    }

    #[test]
    fn drops_access_and_combined_rename() {
        assert!(translate(event(EventKind::Access(AccessKind::Any), &["/w/a"])).is_empty());
        assert!(
            translate(event(
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
                &["/w/a", "/w/b"]
            ))
            .is_empty()
        );
    }

    #[test]
    fn one_event_per_path() {
        let out = translate(event(EventKind::Remove(RemoveKind::Any), &["/w/a", "/w/b"]));
        assert_eq!(
            out,
            vec![
                FsEvent::new("/w/a", FsOp::Remove),
                FsEvent::new("/w/b", FsOp::Remove)
            ]
        );
    }

    #[test]
    fn display_reads_like_a_log_line() {
        assert_eq!(
            FsEvent::new("/w/x", FsOp::Write).to_string(),
            "WRITE \"/w/x\""
        );
    }
}
