pub mod builders;
pub mod fake_launcher;

pub use builders::{fast_settings, ConfigFileBuilder, TempTree};
pub use fake_launcher::{FakeJob, FakeLauncher, FakeStats};

use std::sync::Once;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("buildpool=debug,warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future, failing the test if it takes longer than `limit`.
///
/// Returns the output together with how long it actually took.
pub async fn within<F, T>(limit: Duration, f: F) -> (T, Duration)
where
    F: std::future::Future<Output = T>,
{
    let started = Instant::now();
    let out = tokio::time::timeout(limit, f)
        .await
        .unwrap_or_else(|_| panic!("test future did not finish within {limit:?}"));
    (out, started.elapsed())
}
