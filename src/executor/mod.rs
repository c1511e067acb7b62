//! Running test units and suites.
//!
//! A [`Suite`] is a tree of units and nested suites. Running it queues every
//! leaf unit on a shared [`Semaphore`]; a unit runs once it holds a slot and
//! gives the slot back when its (possibly asynchronous) lifecycle has been
//! reported. Nested suites never take a slot themselves.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use deferunit::clock::MockClock;
//! use deferunit::executor::{RunContext, Suite};
//! use deferunit::result::TestResult;
//! use deferunit::sync::Semaphore;
//!
//! let result = TestResult::new();
//! let ctx = RunContext::new(result.clone(), Semaphore::new(1), Arc::new(MockClock::new()));
//!
//! let finished = Suite::new().run(&ctx);
//! assert!(finished.is_resolved());
//! assert!(result.was_successful());
//! ```

mod suite;
mod unit;

pub use suite::{Entry, Suite};
pub use unit::{CaseUnit, Phase};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::case::TestId;
use crate::clock::Timer;
use crate::deferred::Deferred;
use crate::result::TestResult;
use crate::sync::Semaphore;

/// Time an asynchronous test body may take before it is reported as timed out.
pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(5);

/// Something a [`Suite`] can schedule.
pub trait Runnable: Send + Sync {
    /// Identity used for reporting.
    fn id(&self) -> &TestId;

    /// Runs the whole lifecycle, reporting into `ctx`'s result.
    ///
    /// The returned deferred resolves once the outcome has been reported.
    fn run(&self, ctx: &RunContext) -> Deferred<()>;
}

/// Everything shared by the units of one run.
#[derive(Clone)]
pub struct RunContext {
    result: TestResult,
    lock: Semaphore,
    timer: Arc<dyn Timer>,
    watchdog: Duration,
}

impl RunContext {
    /// Creates a context with the default watchdog.
    #[must_use]
    pub fn new(result: TestResult, lock: Semaphore, timer: Arc<dyn Timer>) -> Self {
        Self {
            result,
            lock,
            timer,
            watchdog: DEFAULT_WATCHDOG,
        }
    }

    /// Sets how long an asynchronous body may run.
    #[must_use]
    pub fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// The shared accumulator.
    #[must_use]
    pub fn result(&self) -> &TestResult {
        &self.result
    }

    /// The semaphore bounding concurrent units.
    #[must_use]
    pub fn lock(&self) -> &Semaphore {
        &self.lock
    }

    /// The run's timer.
    #[must_use]
    pub fn timer(&self) -> Arc<dyn Timer> {
        Arc::clone(&self.timer)
    }

    /// The watchdog interval.
    #[must_use]
    pub fn watchdog(&self) -> Duration {
        self.watchdog
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("result", &self.result)
            .field("lock", &self.lock)
            .field("watchdog", &self.watchdog)
            .finish_non_exhaustive()
    }
}
