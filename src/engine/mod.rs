// src/engine/mod.rs

//! Orchestration engine for rerun.
//!
//! This module ties together:
//! - the watch set (which directories are observed)
//! - the process runner (the single execution of the user's command)
//! - the main event loop that reacts to:
//!   - filesystem events
//!   - shutdown signals
//!
//! The pure decision logic lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]; [`signals`] turns SIGINT/SIGTERM into a
//! shutdown request.

use crate::watch::FsEvent;

/// Events flowing into the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Something changed under a watched directory.
    FsChanged(FsEvent),
    /// Graceful shutdown requested (SIGINT / SIGTERM).
    ShutdownRequested,
}

/// Why the runtime loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A termination signal was received and cleanup has finished.
    Signalled,
}

impl ExitReason {
    /// Process exit status to report for this reason.
    pub fn exit_code(self) -> i32 {
        match self {
            ExitReason::Signalled => 1,
        }
    }
}

pub mod core;
pub mod runtime;
pub mod signals;

pub use self::core::{ControllerState, CoreCommand, CoreController, CoreStep};
pub use runtime::Runtime;
pub use signals::spawn_signal_listener;
