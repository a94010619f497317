// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The runtime talks to a `ProcessBackend` instead of a concrete [`Runner`].
//! This makes it easy to swap in a fake in tests (for example one that only
//! records start/stop calls) while production uses the real runner.

use std::future::Future;
use std::pin::Pin;

use super::runner::Runner;

/// Trait abstracting the lifecycle of the single command execution.
pub trait ProcessBackend: Send {
    /// Launch a new execution. Returns whether one was started.
    fn start(&mut self) -> bool;

    /// Cancel the current execution and resolve once it has fully finished.
    fn stop(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    /// Refuse all further starts.
    fn begin_exit(&mut self);
}

impl ProcessBackend for Runner {
    fn start(&mut self) -> bool {
        Runner::start(self)
    }

    fn stop(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(Runner::stop(self))
    }

    fn begin_exit(&mut self) {
        Runner::begin_exit(self);
    }
}
