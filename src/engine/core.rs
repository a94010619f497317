// src/engine/core.rs

//! Pure core controller.
//!
//! Consumes [`RuntimeEvent`]s and produces the list of [`CoreCommand`]s the
//! IO shell (`engine::runtime::Runtime`) should carry out. The only outside
//! contact is a `stat` through the [`FileSystem`] trait, so the core can be
//! unit tested against the in-memory mock without Tokio, channels or
//! processes.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error};

use crate::engine::RuntimeEvent;
use crate::fs::{EntryKind, FileSystem};
use crate::watch::{FsEvent, FsOp};

/// Command produced by the core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// A directory appeared: watch it and anything already inside it.
    WatchTree(PathBuf),
    /// Something was removed or renamed away: drop its watch, and those of
    /// any directories below it.
    Unwatch(PathBuf),
    /// Stop the current execution and start a fresh one.
    Restart,
    /// Mark the runner as exiting, stop it and close the watch set.
    Shutdown,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn idle(keep_running: bool) -> Self {
        Self {
            commands: Vec::new(),
            keep_running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// A command execution is (or may be) active and events are handled.
    Running,
    /// Terminal.
    ShuttingDown,
}

pub struct CoreController {
    fs: Arc<dyn FileSystem>,
    state: ControllerState,
    events_handled: u64,
}

impl fmt::Debug for CoreController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreController")
            .field("state", &self.state)
            .field("events_handled", &self.events_handled)
            .finish_non_exhaustive()
    }
}

impl CoreController {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            state: ControllerState::Running,
            events_handled: 0,
        }
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Number of filesystem events that led to a restart.
    pub fn events_handled(&self) -> u64 {
        self.events_handled
    }

    /// Handle a single runtime event, updating state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        if self.state == ControllerState::ShuttingDown {
            debug!(?event, "ignoring event after shutdown");
            return CoreStep::idle(false);
        }

        match event {
            RuntimeEvent::FsChanged(fs_event) => self.handle_fs_event(fs_event),
            RuntimeEvent::ShutdownRequested => {
                self.state = ControllerState::ShuttingDown;
                CoreStep {
                    commands: vec![CoreCommand::Shutdown],
                    keep_running: false,
                }
            }
        }
    }

    /// Every event restarts the command; creations, removals and renames first
    /// update the watch set.
    fn handle_fs_event(&mut self, event: FsEvent) -> CoreStep {
        debug!(event = %event, "filesystem event");
        self.events_handled += 1;

        let mut commands = Vec::with_capacity(2);
        match event.op {
            FsOp::Create => match self.fs.entry_kind(&event.path) {
                Ok(EntryKind::Dir) => commands.push(CoreCommand::WatchTree(event.path)),
                Ok(_) => {}
                Err(err) => {
                    error!(path = ?event.path, error = %err, "unable to get filesystem info");
                }
            },
            // A renamed directory is no longer at this path; a new one created
            // here later must be registered afresh.
            FsOp::Remove | FsOp::Rename => commands.push(CoreCommand::Unwatch(event.path)),
            FsOp::Write | FsOp::Chmod => {}
        }
        commands.push(CoreCommand::Restart);

        CoreStep {
            commands,
            keep_running: true,
        }
    }
}
