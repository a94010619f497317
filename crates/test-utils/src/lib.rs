pub mod fake_subscription;
pub mod recording_runner;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use rerun::logging::LOG_ENV_VAR;
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for steps that only touch in-memory fakes.
pub const FAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for steps that wait on real processes or the OS watcher,
/// which can be slow to deliver on a loaded machine.
pub const OS_TIMEOUT: Duration = Duration::from_secs(15);

static INIT: Once = Once::new();

/// Install a per-test log writer once per test binary.
///
/// The filter is read from `RERUN_LOG` (the variable the binary itself
/// honours), then `RUST_LOG`, and defaults to debug output for this crate
/// only. Output is shown for failing tests, or with `-- --nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("warn,rerun=debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .with_line_number(true)
            .init();
    });
}

/// [`with_deadline`] with [`FAKE_TIMEOUT`].
pub async fn with_timeout<F: Future>(f: F) -> F::Output {
    with_deadline(FAKE_TIMEOUT, f).await
}

/// Run `f`, failing the test if it takes longer than `limit`.
pub async fn with_deadline<F: Future>(limit: Duration, f: F) -> F::Output {
    match tokio::time::timeout(limit, f).await {
        Ok(output) => output,
        Err(_) => panic!("test step did not finish within {limit:?}"),
    }
}

/// Poll `condition` every 10ms until it holds or `limit` has passed.
/// Returns whether it held.
pub async fn eventually(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
