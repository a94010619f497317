// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::load_for_root;
use crate::engine::{CoreController, ExitReason, Runtime, RuntimeEvent, spawn_signal_listener};
use crate::errors::Result;
use crate::exec::{ExitFlag, Runner, RunnerOptions};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{NotifySubscription, WatchSet};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading (`Rerun.toml`, optional)
/// - the filesystem watcher and the initial watch set
/// - the command runner
/// - SIGINT / SIGTERM handling
/// - the runtime loop
///
/// Only returns once a termination signal has been handled (or on a fatal
/// error); the loop otherwise runs forever.
pub async fn run(args: CliArgs) -> Result<ExitReason> {
    let command = args.command_line();

    let cwd = std::env::current_dir().context("unable to determine current directory")?;
    // Canonicalize once so we have a stable base path.
    let root = cwd.canonicalize().unwrap_or(cwd);
    let cfg = load_for_root(&root)?;

    // Signals first, so a Ctrl-C during the initial traversal is not lost.
    let exit_flag = ExitFlag::new();
    let (control_tx, control_rx) = mpsc::channel::<RuntimeEvent>(4);
    let _signals = spawn_signal_listener(exit_flag.clone(), control_tx);

    let (subscription, events) = NotifySubscription::new()?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut watch_set = WatchSet::new(subscription, events, cfg.watch.ignore.clone());
    let watched = watch_set.initialize(&root, fs.as_ref());
    info!(?root, watched, "watching for changes");

    let runner =
        Runner::new(command, RunnerOptions::from(&cfg.command)).with_exit_flag(exit_flag);
    info!(command = %runner.command(), "command configured");

    let core = CoreController::new(fs);
    let runtime = Runtime::new(core, runner, watch_set, control_rx);
    runtime.run().await
}
