#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use deferunit::clock::MockClock;
use deferunit::executor::RunContext;
use deferunit::result::TestResult;
use deferunit::sync::Semaphore;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Watchdog used by the harness; short so timeout tests stay readable.
pub const TEST_WATCHDOG: Duration = Duration::from_millis(500);

/// Initialize test logging, once per test binary.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("deferunit=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

/// A fresh result plus a context on virtual time with `width` slots.
pub fn harness(clock: &MockClock, width: usize) -> (TestResult, RunContext) {
    let result = TestResult::new();
    let ctx = RunContext::new(result.clone(), Semaphore::new(width), Arc::new(clock.clone()))
        .with_watchdog(TEST_WATCHDOG);
    (result, ctx)
}
