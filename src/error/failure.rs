//! Test-level failures and panic classification.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Write as _;
use std::time::Duration;

use super::Error;

/// Why a test did not pass.
///
/// [`Failure::is_assertion`] separates the expected, test-declared kind
/// (reported as a *failure*) from everything else (reported as an *error*).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// An assertion did not hold.
    #[error("{message}")]
    Assertion {
        /// Human-readable description.
        message: String,
        /// Rendered expected value, when the assertion compared values.
        expected: Option<String>,
        /// Rendered actual value, when the assertion compared values.
        actual: Option<String>,
    },

    /// Any other error raised by setup, body, teardown or a continuation.
    #[error("{message}")]
    Error {
        /// Human-readable description.
        message: String,
        /// Backtrace captured at construction, if capture was enabled.
        trace: Option<String>,
    },

    /// A panic whose payload was neither a string nor a `Failure`.
    #[error("non-error value raised: {rendered}")]
    NonError {
        /// Best-effort rendering of the raw payload.
        rendered: String,
    },

    /// An asynchronous body did not settle within the watchdog interval.
    #[error("test timed out after {0:?}")]
    Timeout(Duration),
}

impl Failure {
    /// Creates an assertion failure.
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Creates an assertion failure carrying the compared values.
    #[must_use]
    pub fn mismatch(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Assertion {
            message: message.into(),
            expected: Some(expected.into()),
            actual: Some(actual.into()),
        }
    }

    /// Creates an unclassified error, capturing a backtrace when enabled.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let backtrace = Backtrace::capture();
        let trace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };
        Self::Error {
            message: message.into(),
            trace,
        }
    }

    /// Returns `true` for the assertion kind.
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }

    /// Converts a caught panic payload into a failure.
    ///
    /// A `Failure` payload keeps its kind. String payloads that come from the
    /// std `assert!` family (they start with `assertion`) are assertion
    /// failures; other strings are errors. Anything else is wrapped.
    ///
    /// # Panics
    ///
    /// Resumes the panic if the payload is a scheduler [`Error`]; those are
    /// bugs in the engine, not test outcomes.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if payload.is::<Error>() {
            std::panic::resume_unwind(payload);
        }
        let payload = match payload.downcast::<Failure>() {
            Ok(failure) => return *failure,
            Err(other) => other,
        };
        if let Some(text) = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&'static str>().copied())
        {
            return if text.starts_with("assertion") {
                Self::assertion(text)
            } else {
                Self::Error {
                    message: text.to_string(),
                    trace: None,
                }
            };
        }
        Self::NonError {
            rendered: render_opaque(payload.as_ref()),
        }
    }

    /// Renders the failure for the accumulator's message lists.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = self.to_string();
        match self {
            Self::Assertion {
                expected, actual, ..
            } => {
                if let Some(expected) = expected {
                    let _ = write!(out, "\n  expected: {expected}");
                }
                if let Some(actual) = actual {
                    let _ = write!(out, "\n  actual: {actual}");
                }
            }
            Self::Error {
                trace: Some(trace), ..
            } => {
                let _ = write!(out, "\n{trace}");
            }
            _ => {}
        }
        out
    }
}

/// Runs `f`, turning a panic into a [`Failure`].
pub(crate) fn isolate<R>(f: impl FnOnce() -> Result<R, Failure>) -> Result<R, Failure> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(Failure::from_panic(payload)))
}

fn render_opaque(payload: &(dyn Any + Send)) -> String {
    macro_rules! try_render {
        ($($ty:ty),*) => {
            $(
                if let Some(value) = payload.downcast_ref::<$ty>() {
                    return format!("{value:?}");
                }
            )*
        };
    }
    try_render!(i32, i64, u32, u64, usize, isize, f64, bool, char);
    "<opaque panic payload>".to_string()
}
