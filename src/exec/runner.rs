// src/exec/runner.rs

//! The command runner.
//!
//! A [`Runner`] owns at most one execution of the user's command at a time.
//! Each execution lives in its own Tokio task that:
//! - spawns `<shell> <flag> <command>` as the leader of a new process group,
//! - tees the child's stdout/stderr to ours and into memory,
//! - waits for the child to exit or for a cancellation request, whichever
//!   comes first, and terminates the process group on cancellation.
//!
//! [`Runner::stop`] only returns once that task has finished, i.e. the
//! process has been reaped and both output pipes are drained.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CommandSection;
use crate::exec::output::forward_stream;
use crate::exec::process_group::ProcessGroup;

/// How commands are executed.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub shell: String,
    pub shell_flag: String,
    /// Grace period between the termination request and SIGKILL.
    pub kill_timeout: Duration,
    /// Bytes retained per captured stream.
    pub capture_limit: usize,
    /// Echo child output to our own stdout/stderr.
    pub forward_output: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::from(&CommandSection::default())
    }
}

impl From<&CommandSection> for RunnerOptions {
    fn from(section: &CommandSection) -> Self {
        Self {
            shell: section.shell.clone(),
            shell_flag: section.shell_flag.clone(),
            kill_timeout: section.kill_timeout(),
            capture_limit: section.capture_limit,
            forward_output: section.forward_output,
        }
    }
}

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The command exited on its own.
    Exited(ExitStatus),
    /// The execution was stopped from outside.
    Cancelled,
    SpawnFailed(String),
    WaitFailed(String),
}

/// Result of one execution, kept for inspection after it ends.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub run_id: u64,
    pub outcome: RunOutcome,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RunRecord {
    fn without_output(run_id: u64, outcome: RunOutcome) -> Self {
        Self {
            run_id,
            outcome,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Shared "we are shutting down" flag.
///
/// Set from the signal path while the controller may be mid-restart; once set,
/// [`Runner::start`] refuses to launch anything.
#[derive(Debug, Clone, Default)]
pub struct ExitFlag(Arc<AtomicBool>);

impl ExitFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Internal handle for the current execution.
struct ActiveRun {
    run_id: u64,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<RunRecord>,
}

/// Decrements the completion tracker when the execution task ends, however
/// it ends (including panics and aborts).
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Runner {
    command: String,
    options: RunnerOptions,
    exiting: ExitFlag,
    in_flight: Arc<AtomicUsize>,
    current: Option<ActiveRun>,
    next_run_id: u64,
    last_run: Option<RunRecord>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("command", &self.command)
            .field("exiting", &self.exiting.is_set())
            .field("in_flight", &self.in_flight())
            .field("current", &self.current.as_ref().map(|a| a.run_id))
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(command: impl Into<String>, options: RunnerOptions) -> Self {
        Self {
            command: command.into(),
            options,
            exiting: ExitFlag::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            current: None,
            next_run_id: 0,
            last_run: None,
        }
    }

    /// Share an existing exit flag (e.g. one already handed to a signal task).
    pub fn with_exit_flag(mut self, flag: ExitFlag) -> Self {
        self.exiting = flag;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn exit_flag(&self) -> ExitFlag {
        self.exiting.clone()
    }

    /// Number of execution tasks that have not yet fully finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True while the current execution's task is still running.
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Record of the most recently stopped or awaited execution.
    pub fn last_run(&self) -> Option<&RunRecord> {
        self.last_run.as_ref()
    }

    pub fn begin_exit(&self) {
        debug!("runner marked as exiting");
        self.exiting.set();
    }

    /// Launch a new execution in the background.
    ///
    /// Returns `false` without doing anything when the runner is exiting or
    /// when the previous execution has not been stopped yet.
    pub fn start(&mut self) -> bool {
        if self.exiting.is_set() {
            debug!("runner is exiting; not starting a new execution");
            return false;
        }
        if let Some(active) = &self.current {
            warn!(
                run_id = active.run_id,
                "previous execution has not been stopped; refusing to start another"
            );
            return false;
        }

        self.next_run_id += 1;
        let run_id = self.next_run_id;

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        let execution = Execution {
            run_id,
            command: self.command.clone(),
            options: self.options.clone(),
        };

        let handle = tokio::spawn(async move {
            let _guard = guard;
            execution.run(cancel_rx).await
        });

        debug!(run_id, command = %self.command, "execution started");
        self.current = Some(ActiveRun {
            run_id,
            cancel: Some(cancel_tx),
            handle,
        });
        true
    }

    /// Cancel the current execution and wait until it has fully finished.
    ///
    /// A no-op when nothing is running.
    pub async fn stop(&mut self) {
        let Some(mut active) = self.current.take() else {
            debug!("stop requested with no active execution");
            return;
        };

        debug!(run_id = active.run_id, "stopping execution");
        if let Some(cancel) = active.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(run_id = active.run_id, "execution had already finished");
            }
        }

        self.collect(active.run_id, active.handle).await;
    }

    /// Wait for the current execution to finish on its own.
    pub async fn wait(&mut self) -> Option<&RunRecord> {
        if let Some(active) = self.current.take() {
            let ActiveRun {
                run_id,
                cancel,
                handle,
            } = active;
            self.collect(run_id, handle).await;
            // Dropping the sender earlier would read as a cancellation.
            drop(cancel);
        }
        self.last_run.as_ref()
    }

    async fn collect(&mut self, run_id: u64, handle: JoinHandle<RunRecord>) {
        match handle.await {
            Ok(record) => {
                debug!(run_id, outcome = ?record.outcome, "execution finished");
                self.last_run = Some(record);
            }
            Err(err) => {
                warn!(run_id, error = %err, "execution task did not complete cleanly");
            }
        }
    }
}

/// Everything one execution task needs, moved into the task.
struct Execution {
    run_id: u64,
    command: String,
    options: RunnerOptions,
}

impl Execution {
    async fn run(self, mut cancel_rx: oneshot::Receiver<()>) -> RunRecord {
        let run_id = self.run_id;

        let mut cmd = Command::new(&self.options.shell);
        cmd.arg(&self.options.shell_flag)
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!(
                    run_id,
                    shell = %self.options.shell,
                    error = %err,
                    "failed to spawn command"
                );
                return RunRecord::without_output(run_id, RunOutcome::SpawnFailed(err.to_string()));
            }
        };
        let group = ProcessGroup::of(&child);
        info!(run_id, pid = ?child.id(), command = %self.command, "command running");

        let limit = self.options.capture_limit;
        let forward = self.options.forward_output;
        let stdout_pump = child.stdout.take().map(|pipe| {
            tokio::spawn(forward_stream(
                pipe,
                forward.then(tokio::io::stdout),
                limit,
                "stdout",
                run_id,
            ))
        });
        let stderr_pump = child.stderr.take().map(|pipe| {
            tokio::spawn(forward_stream(
                pipe,
                forward.then(tokio::io::stderr),
                limit,
                "stderr",
                run_id,
            ))
        });
        let mut drain = Box::pin(async move {
            let stdout = collect_pump(stdout_pump).await;
            let stderr = collect_pump(stderr_pump).await;
            (stdout, stderr)
        });

        let outcome = tokio::select! {
            status = child.wait() => match status {
                Ok(status) => {
                    debug!(run_id, %status, "command exited");
                    RunOutcome::Exited(status)
                }
                Err(err) => {
                    warn!(run_id, error = %err, "failed waiting for command");
                    RunOutcome::WaitFailed(err.to_string())
                }
            },
            // A dropped sender (runner gone) counts as a cancellation too.
            _ = &mut cancel_rx => {
                info!(run_id, "cancellation requested; terminating process group");
                group.terminate(&mut child, self.options.kill_timeout, run_id).await;
                RunOutcome::Cancelled
            }
        };

        // The leader is gone, but descendants may still hold the pipes open.
        let (stdout, stderr) = if outcome == RunOutcome::Cancelled {
            match tokio::time::timeout(self.options.kill_timeout, &mut drain).await {
                Ok(streams) => streams,
                Err(_) => {
                    debug!(run_id, "output still open after termination; killing process group");
                    group.kill(run_id);
                    drain.await
                }
            }
        } else {
            tokio::select! {
                streams = &mut drain => streams,
                _ = &mut cancel_rx => {
                    debug!(run_id, "cancelled while draining output; killing process group");
                    group.kill(run_id);
                    drain.await
                }
            }
        };

        RunRecord {
            run_id,
            outcome,
            stdout,
            stderr,
        }
    }
}

async fn collect_pump(pump: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match pump {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    }
}
