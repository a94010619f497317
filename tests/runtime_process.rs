// tests/runtime_process.rs
#![cfg(unix)]

mod common;
use crate::common::{
    OS_TIMEOUT, TestResult, eventually, fs_event, init_tracing, project_tree, with_deadline,
};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use rerun::engine::{CoreController, ExitReason, Runtime, RuntimeEvent};
use rerun::exec::{RunOutcome, Runner, RunnerOptions};
use rerun::watch::FsOp;
use rerun_test_utils::fake_subscription::{FakeSubscription, FakeWatch, fake_watch_set};

fn process_runtime(
    command: &str,
) -> (
    Runtime<Runner, FakeSubscription>,
    FakeWatch,
    mpsc::Sender<RuntimeEvent>,
) {
    let fs = project_tree();
    let (mut watch_set, watch) = fake_watch_set(&[".git"]);
    watch_set.initialize(Path::new("/p"), &fs);

    let options = RunnerOptions {
        forward_output: false,
        kill_timeout: Duration::from_millis(500),
        ..RunnerOptions::default()
    };
    let runner = Runner::new(command, options);
    let (control_tx, control_rx) = mpsc::channel(4);
    let core = CoreController::new(Arc::new(fs));
    (
        Runtime::new(core, runner, watch_set, control_rx),
        watch,
        control_tx,
    )
}

#[tokio::test]
async fn change_cancels_running_command_and_starts_a_new_one() {
    init_tracing();
    let (mut runtime, _watch, _control) = process_runtime("sleep 30");

    assert!(runtime.start());
    assert!(runtime.runner().is_running());

    let restarted = with_deadline(OS_TIMEOUT, runtime.handle(fs_event("/p/src/lib.rs", FsOp::Write))).await;
    assert!(restarted);

    let previous = runtime.runner().last_run().cloned();
    let previous = previous.expect("first execution was recorded");
    assert_eq!(previous.run_id, 1);
    assert_eq!(previous.outcome, RunOutcome::Cancelled);

    assert!(runtime.runner().is_running());
    assert_eq!(runtime.runner().in_flight(), 1);

    with_deadline(OS_TIMEOUT, runtime.handle(RuntimeEvent::ShutdownRequested)).await;
    assert!(!runtime.runner().is_running());
    assert_eq!(runtime.runner().in_flight(), 0);
}

#[tokio::test]
async fn finished_command_is_restarted_on_change() {
    init_tracing();
    let (mut runtime, _watch, _control) = process_runtime("echo run");

    runtime.start();
    assert!(eventually(OS_TIMEOUT, || !runtime.runner().is_running()).await);
    with_deadline(OS_TIMEOUT, runtime.handle(fs_event("/p/Cargo.toml", FsOp::Write))).await;

    let first = runtime.runner().last_run().cloned().expect("first run recorded");
    assert_eq!(first.stdout_lossy(), "run\n");
    assert!(matches!(first.outcome, RunOutcome::Exited(status) if status.success()));
}

#[tokio::test]
async fn signalled_shutdown_leaves_no_process_behind() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("still-running");
    let command = format!("sleep 30 & wait; touch {}", marker.display());
    let (runtime, _watch, control_tx) = process_runtime(&command);

    let handle = tokio::spawn(runtime.run());
    tokio::time::sleep(Duration::from_millis(200)).await;
    control_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let reason = with_deadline(OS_TIMEOUT, handle).await??;
    assert_eq!(reason, ExitReason::Signalled);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!marker.exists());
    Ok(())
}
