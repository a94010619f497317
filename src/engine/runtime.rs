// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{RerunError, Result};
use crate::exec::ProcessBackend;
use crate::watch::{Subscription, WatchSet};

use super::core::CoreController;
use super::{CoreCommand, ExitReason, RuntimeEvent};

/// Drives the process runner and the watch set in response to
/// filesystem events and shutdown requests.
///
/// This is the IO shell around `CoreController`, which decides what each
/// event means. Events are handled strictly one at a time: a restart is
/// complete (old execution fully stopped, new one started) before the next
/// event is read.
pub struct Runtime<P: ProcessBackend, S: Subscription> {
    core: CoreController,
    runner: P,
    watch_set: WatchSet<S>,
    control_rx: mpsc::Receiver<RuntimeEvent>,
    control_open: bool,
}

impl<P: ProcessBackend, S: Subscription> fmt::Debug for Runtime<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("watch_set", &self.watch_set)
            .finish_non_exhaustive()
    }
}

impl<P: ProcessBackend, S: Subscription> Runtime<P, S> {
    pub fn new(
        core: CoreController,
        runner: P,
        watch_set: WatchSet<S>,
        control_rx: mpsc::Receiver<RuntimeEvent>,
    ) -> Self {
        Self {
            core,
            runner,
            watch_set,
            control_rx,
            control_open: true,
        }
    }

    pub fn core(&self) -> &CoreController {
        &self.core
    }

    pub fn runner(&self) -> &P {
        &self.runner
    }

    pub fn watch_set(&self) -> &WatchSet<S> {
        &self.watch_set
    }

    /// Start the initial execution.
    pub fn start(&mut self) -> bool {
        self.runner.start()
    }

    /// Main event loop.
    ///
    /// - Starts the first execution.
    /// - Waits for the next shutdown request or filesystem event, preferring
    ///   shutdown requests when both are ready.
    /// - Feeds each event through the core and executes the resulting commands.
    ///
    /// Returns once a shutdown has been carried out. The filesystem event
    /// stream never ends on its own; if it does, the current execution is
    /// stopped and an error is returned.
    pub async fn run(mut self) -> Result<ExitReason> {
        info!("rerun runtime started");
        self.start();

        loop {
            let event = tokio::select! {
                biased;

                control = self.control_rx.recv(), if self.control_open => match control {
                    Some(event) => event,
                    None => {
                        debug!("control channel closed; only filesystem events remain");
                        self.control_open = false;
                        continue;
                    }
                },

                fs_event = self.watch_set.next_event() => match fs_event {
                    Some(fs_event) => RuntimeEvent::FsChanged(fs_event),
                    None => {
                        warn!("filesystem event stream ended; stopping command");
                        self.runner.begin_exit();
                        self.runner.stop().await;
                        self.watch_set.close();
                        return Err(RerunError::WatchStreamClosed);
                    }
                },
            };

            if !self.handle(event).await {
                info!("shutdown complete; stopping runtime");
                return Ok(ExitReason::Signalled);
            }
        }
    }

    /// Handle one event. Returns whether the loop should keep running.
    pub async fn handle(&mut self, event: RuntimeEvent) -> bool {
        debug!(?event, "runtime received event");

        let step = self.core.step(event);
        for command in step.commands {
            self.execute_command(command).await;
        }

        step.keep_running
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::WatchTree(path) => {
                let added = self.watch_set.add_tree(&path, self.core.fs());
                debug!(?path, added, "watching new directory");
            }
            CoreCommand::Unwatch(path) => {
                self.watch_set.remove(&path);
            }
            CoreCommand::Restart => {
                self.runner.stop().await;
                if !self.runner.start() {
                    debug!("restart skipped; runner did not start");
                }
            }
            CoreCommand::Shutdown => {
                info!("shutting down: stopping command and filesystem watcher");
                self.runner.begin_exit();
                self.runner.stop().await;
                self.watch_set.close();
            }
        }
    }
}
