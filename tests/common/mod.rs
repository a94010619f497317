#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use rerun::engine::{CoreController, Runtime, RuntimeEvent};
use rerun::fs::mock::MockFileSystem;
use rerun::watch::{FsEvent, FsOp};
use rerun_test_utils::fake_subscription::{FakeSubscription, FakeWatch, fake_watch_set};
use rerun_test_utils::recording_runner::RecordingRunner;

pub use rerun_test_utils::{FAKE_TIMEOUT, OS_TIMEOUT, eventually, init_tracing, with_deadline, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A runtime wired entirely to fakes, plus the handles tests poke at.
pub struct Harness {
    pub runtime: Runtime<RecordingRunner, FakeSubscription>,
    pub runner: RecordingRunner,
    pub watch: FakeWatch,
    pub fs: MockFileSystem,
    pub control_tx: mpsc::Sender<RuntimeEvent>,
}

/// Build a harness over `fs`, with the watch set initialised from `root`.
pub fn harness(fs: MockFileSystem, root: &Path) -> Harness {
    harness_with_runner(fs, root, RecordingRunner::new())
}

pub fn harness_with_runner(fs: MockFileSystem, root: &Path, runner: RecordingRunner) -> Harness {
    let (mut watch_set, watch) = fake_watch_set(&[".git"]);
    watch_set.initialize(root, &fs);

    let (control_tx, control_rx) = mpsc::channel(4);
    let core = CoreController::new(Arc::new(fs.clone()));
    let runtime = Runtime::new(core, runner.clone(), watch_set, control_rx);

    Harness {
        runtime,
        runner,
        watch,
        fs,
        control_tx,
    }
}

pub fn fs_event(path: impl AsRef<Path>, op: FsOp) -> RuntimeEvent {
    RuntimeEvent::FsChanged(FsEvent::new(path.as_ref(), op))
}

/// `/p` with a source directory, a manifest and a `.git` directory.
pub fn project_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/p/Cargo.toml");
    fs.add_file("/p/src/lib.rs");
    fs.add_file("/p/.git/HEAD");
    fs
}
