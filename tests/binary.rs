// tests/binary.rs
#![cfg(unix)]

mod common;
use crate::common::{OS_TIMEOUT, TestResult, init_tracing, with_deadline};

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

fn rerun_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rerun"))
}

#[tokio::test]
async fn missing_command_exits_with_status_one() -> TestResult {
    init_tracing();
    let output = with_deadline(OS_TIMEOUT, rerun_bin().stdin(Stdio::null()).output()).await?;

    assert_eq!(output.status.code(), Some(1));
    assert!(!output.stderr.is_empty());
    Ok(())
}

#[tokio::test]
async fn runs_command_and_exits_one_on_sigterm() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut child = rerun_bin()
        .args(["echo", "hello"])
        .current_dir(dir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().ok_or("stdout not captured")?;
    let mut lines = BufReader::new(stdout).lines();
    let first = with_deadline(OS_TIMEOUT, lines.next_line()).await?;
    assert_eq!(first.as_deref(), Some("hello"));

    let pid = child.id().ok_or("child already reaped")? as libc::pid_t;
    // SAFETY: plain signal delivery to a child we own.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    assert_eq!(rc, 0);

    let status = with_deadline(OS_TIMEOUT, child.wait()).await?;
    assert_eq!(status.code(), Some(1));
    Ok(())
}

#[tokio::test]
async fn command_words_are_joined_and_run_by_the_shell() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let mut child = rerun_bin()
        .args(["echo", "a", "&&", "echo", "b"])
        .current_dir(dir.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child.stdout.take().ok_or("stdout not captured")?;
    let mut lines = BufReader::new(stdout).lines();
    assert_eq!(with_deadline(OS_TIMEOUT, lines.next_line()).await?.as_deref(), Some("a"));
    assert_eq!(with_deadline(OS_TIMEOUT, lines.next_line()).await?.as_deref(), Some("b"));

    child.start_kill()?;
    child.wait().await?;
    Ok(())
}
