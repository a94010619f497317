// src/engine/signals.rs

//! SIGINT / SIGTERM → shutdown request.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::engine::RuntimeEvent;
use crate::exec::ExitFlag;

/// Spawn a task that waits for a termination signal, marks the runner as
/// exiting straight away (so a restart that is already in progress won't
/// launch a new execution) and then asks the runtime to shut down.
pub fn spawn_signal_listener(
    exit_flag: ExitFlag,
    control_tx: mpsc::Sender<RuntimeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_termination().await {
            Ok(signal) => info!(signal, "termination signal received"),
            Err(err) => {
                error!(error = %err, "failed to listen for termination signals");
                return;
            }
        }

        exit_flag.set();
        let _ = control_tx.send(RuntimeEvent::ShutdownRequested).await;
    })
}

#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => Ok("SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
