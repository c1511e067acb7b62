//! Helpers shared by the crate's unit tests.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Routes `tracing` output through the test harness's captured writer.
///
/// Honours `RUST_LOG`, defaulting to `deferunit=trace`. The first call wins;
/// later calls are no-ops.
pub(crate) fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("deferunit=trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}
