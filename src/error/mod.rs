//! Error definitions
//!
//! Two kinds of error live here and they never mix:
//!
//! - [`Error`] is a scheduler misuse (double resolution, unbalanced release).
//!   It indicates a bug in the code driving the engine and is raised as a
//!   panic carrying the `Error` value, never recorded as a test outcome.
//! - [`Failure`] is what a test produces when it does not pass. It is always
//!   funneled into a [`TestResult`](crate::result::TestResult).

mod failure;

pub(crate) use failure::isolate;
pub use failure::Failure;

use thiserror::Error;

/// Main error type for deferunit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A `Deferred` was resolved twice.
    #[error("deferred has already been resolved")]
    AlreadyResolved,

    /// A `Deferred` whose result was handed off was used again.
    #[error("deferred result has already been consumed by a chained deferred")]
    AlreadyConsumed,

    /// A semaphore was released more times than it was acquired.
    #[error("semaphore released too many times (capacity {capacity})")]
    ReleasedTooManyTimes {
        /// The semaphore's fixed capacity.
        capacity: usize,
    },

    /// A semaphore was created with no slots.
    #[error("semaphore capacity must be greater than zero")]
    ZeroCapacity,

    /// A test unit was requested for a method the case does not define.
    #[error("no such test method {case}.{method}")]
    NoSuchTestMethod {
        /// Registered case name.
        case: String,
        /// Requested method name.
        method: String,
    },
}

impl Error {
    /// Raises this error as a fatal panic.
    ///
    /// The panic payload is the `Error` itself, so code that isolates test
    /// panics can tell a scheduler bug apart from a failing test.
    pub fn raise(self) -> ! {
        tracing::error!(error = %self, "fatal scheduler misuse");
        std::panic::panic_any(self)
    }

    /// Create a missing-method error.
    #[must_use]
    pub fn no_such_test_method(case: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NoSuchTestMethod {
            case: case.into(),
            method: method.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
