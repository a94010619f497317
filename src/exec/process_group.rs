// src/exec/process_group.rs

//! Termination of a command together with everything its shell spawned.
//!
//! Children are started as leaders of their own process group, so signalling
//! the group reaches pipelines and backgrounded jobs as well as the shell.

use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

/// The process group led by a spawned child.
#[derive(Debug, Clone, Copy)]
pub struct ProcessGroup {
    leader: Option<u32>,
}

impl ProcessGroup {
    /// Record the group of a freshly spawned child (its pid is the pgid).
    pub fn of(child: &Child) -> Self {
        Self { leader: child.id() }
    }

    /// Ask the whole group to exit, then wait up to `grace` for the leader.
    /// Anything still running after that is killed.
    pub async fn terminate(&self, child: &mut Child, grace: Duration, run_id: u64) {
        self.signal_term(child, run_id);

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(run_id, %status, "command exited after termination request");
            }
            Ok(Err(err)) => {
                warn!(run_id, error = %err, "failed waiting for command after termination request");
            }
            Err(_) => {
                warn!(run_id, ?grace, "command did not exit in time; killing process group");
                self.kill(run_id);
                if let Err(err) = child.kill().await {
                    warn!(run_id, error = %err, "failed to kill child process");
                }
            }
        }
    }

    #[cfg(unix)]
    fn signal_term(&self, _child: &mut Child, run_id: u64) {
        self.send(libc::SIGTERM, run_id);
    }

    /// SIGKILL the whole group. Used for stragglers that outlive the leader.
    #[cfg(unix)]
    pub fn kill(&self, run_id: u64) {
        self.send(libc::SIGKILL, run_id);
    }

    #[cfg(unix)]
    fn send(&self, signal: libc::c_int, run_id: u64) {
        let Some(pgid) = self.leader else {
            debug!(run_id, "no process group recorded; nothing to signal");
            return;
        };

        debug!(run_id, pgid, signal, "signalling process group");
        // SAFETY: killpg has no memory-safety preconditions.
        let rc = unsafe { libc::killpg(pgid as libc::pid_t, signal) };
        if rc != 0 {
            // ESRCH just means the group is already gone.
            debug!(
                run_id,
                pgid,
                error = %std::io::Error::last_os_error(),
                "killpg failed"
            );
        }
    }

    // Without process groups the best we can do is the immediate child.
    #[cfg(not(unix))]
    fn signal_term(&self, child: &mut Child, run_id: u64) {
        if let Err(err) = child.start_kill() {
            debug!(run_id, error = %err, "failed to kill child process");
        }
    }

    #[cfg(not(unix))]
    pub fn kill(&self, _run_id: u64) {}
}
