//! Shared fixtures for the `taskgraph` integration tests.

pub mod builders;
pub mod captured_events;
pub mod manual_executor;
pub mod parked;
pub mod recording_delegate;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

pub use captured_events::{CapturedEvent, EventCapture};
pub use manual_executor::ManualExecutor;
pub use parked::ParkedBodies;
pub use recording_delegate::{DelegateEvent, RecordingDelegate};

static INIT: Once = Once::new();

/// Route scheduler logs through libtest's output capture, once per binary.
///
/// Filtered by `RUST_LOG` (default `info`); `RUST_LOG=taskgraph=trace`
/// shows every state transition of a failing test.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, panicking if the graph has not got there within 5 seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
