use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rerun::exec::{ExitFlag, ProcessBackend};

/// One simulated execution.
#[derive(Debug, Clone, Copy)]
pub struct Execution {
    pub started: Instant,
    pub ended: Option<Instant>,
}

#[derive(Debug, Default)]
struct RunnerLog {
    executions: Vec<Execution>,
    active: Option<usize>,
    refused_starts: usize,
    stop_calls: usize,
    begin_exit_calls: usize,
    overlapping_starts: usize,
}

/// A process backend that spawns nothing and records every lifecycle call.
///
/// `stop` yields to the scheduler and sleeps for `stop_delay` before marking
/// the execution finished, so callers that don't await it properly would
/// show up as overlapping executions.
#[derive(Debug, Clone)]
pub struct RecordingRunner {
    log: Arc<Mutex<RunnerLog>>,
    exit_flag: ExitFlag,
    stop_delay: Duration,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(RunnerLog::default())),
            exit_flag: ExitFlag::new(),
            stop_delay: Duration::from_millis(1),
        }
    }

    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    pub fn exit_flag(&self) -> ExitFlag {
        self.exit_flag.clone()
    }

    /// Number of executions started so far.
    pub fn starts(&self) -> usize {
        self.log.lock().unwrap().executions.len()
    }

    pub fn stop_calls(&self) -> usize {
        self.log.lock().unwrap().stop_calls
    }

    pub fn refused_starts(&self) -> usize {
        self.log.lock().unwrap().refused_starts
    }

    pub fn begin_exit_calls(&self) -> usize {
        self.log.lock().unwrap().begin_exit_calls
    }

    pub fn is_active(&self) -> bool {
        self.log.lock().unwrap().active.is_some()
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.log.lock().unwrap().executions.clone()
    }

    /// Starts issued while a previous execution was still active.
    pub fn overlapping_starts(&self) -> usize {
        self.log.lock().unwrap().overlapping_starts
    }

    /// True if no two recorded executions overlap in time.
    pub fn executions_are_disjoint(&self) -> bool {
        let executions = self.executions();
        executions.windows(2).all(|pair| match pair[0].ended {
            Some(ended) => ended <= pair[1].started,
            None => false,
        })
    }
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessBackend for RecordingRunner {
    fn start(&mut self) -> bool {
        let mut log = self.log.lock().unwrap();
        if self.exit_flag.is_set() {
            log.refused_starts += 1;
            return false;
        }
        if log.active.is_some() {
            log.overlapping_starts += 1;
        }
        log.executions.push(Execution {
            started: Instant::now(),
            ended: None,
        });
        log.active = Some(log.executions.len() - 1);
        true
    }

    fn stop(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let log = Arc::clone(&self.log);
        let delay = self.stop_delay;
        Box::pin(async move {
            log.lock().unwrap().stop_calls += 1;
            tokio::task::yield_now().await;
            tokio::time::sleep(delay).await;

            let mut log = log.lock().unwrap();
            if let Some(idx) = log.active.take() {
                log.executions[idx].ended = Some(Instant::now());
            }
        })
    }

    fn begin_exit(&mut self) {
        self.exit_flag.set();
        self.log.lock().unwrap().begin_exit_calls += 1;
    }
}
