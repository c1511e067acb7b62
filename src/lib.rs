//! # deferunit
//!
//! > A unittest-style test engine whose tests may finish later
//!
//! **deferunit** runs a tree of test classes. A test method either finishes
//! when it returns or hands back a [`Deferred`](deferred::Deferred) that
//! settles later; the engine waits for it (bounded by a watchdog), runs
//! teardown and records the outcome before the next test takes its slot.
//!
//! ## Quick Start
//!
//! ```rust
//! use deferunit::prelude::*;
//! use std::time::Duration;
//!
//! struct Arithmetic {
//!     ctx: TestContext,
//! }
//!
//! impl TestCase for Arithmetic {
//!     fn create(ctx: &TestContext) -> Self {
//!         Arithmetic { ctx: ctx.clone() }
//!     }
//! }
//!
//! #[deferunit::suite]
//! impl Arithmetic {
//!     fn test_sum(&mut self) -> Result<(), Failure> {
//!         deferunit::ensure_eq!(2 + 2, 4);
//!         Ok(())
//!     }
//!
//!     fn test_later(&mut self) -> Deferred<()> {
//!         self.ctx.later(Duration::from_millis(5), ())
//!     }
//! }
//!
//! let summary = Runner::new(RunnerConfig::new().verbosity(Verbosity::Quiet))
//!     .with_output(Box::new(std::io::sink()))
//!     .run(&Loader::new().case::<Arithmetic>("Arithmetic").suite());
//!
//! assert_eq!(summary.tests_run, 2);
//! assert!(summary.was_successful());
//! ```
//!
//! ## Modules
//!
//! - [`deferred`] - single-resolution futures with ordered continuations
//! - [`sync`] - the counting semaphore bounding concurrent tests
//! - [`clock`] - timers for the watchdog and for delayed test results
//! - [`result`] - the outcome accumulator
//! - [`case`] - the test-authoring surface and loader
//! - [`executor`] - units, suites and their scheduling
//! - [`assertions`] - checks returning assertion failures
//! - [`report`], [`runner`] - console output and the blocking runner

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

extern crate self as deferunit;

pub mod assertions;
pub mod case;
pub mod clock;
pub mod deferred;
pub mod error;
pub mod executor;
pub mod report;
pub mod result;
pub mod runner;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_utils;

/// Prelude for convenient imports
///
/// ```rust
/// use deferunit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::case::{Body, IntoBody, Loader, TestCase, TestContext, TestId, TestMethods};
    pub use crate::clock::{MockClock, SystemTimer, Timer};
    pub use crate::deferred::{Deferred, Outcome, Step};
    pub use crate::error::{Error, Failure};
    pub use crate::report::Verbosity;
    pub use crate::result::TestResult;
    pub use crate::runner::{RunSummary, Runner, RunnerConfig};
    pub use crate::sync::Semaphore;
}

// Re-exports
pub use error::{Error, Failure, Result};
pub use runner::run;

// Re-export the suite macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use deferunit_macros::suite;
