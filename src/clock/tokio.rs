//! Tokio runtime integration.
//!
//! ```rust,ignore
//! use deferunit::clock::TokioTimer;
//!
//! #[tokio::test]
//! async fn runs_on_tokio() {
//!     let timer = TokioTimer::current();
//!     // hand `timer` to a Runner or RunContext
//! }
//! ```

use std::time::{Duration, Instant};

use ::tokio::runtime::Handle;

use super::{Timer, TimerCallback, TimerHandle};

/// A [`Timer`] that schedules callbacks as tokio tasks.
///
/// Cancelling a handle aborts the sleeping task.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: Handle,
    start: Instant,
}

impl TokioTimer {
    /// Creates a timer on the given runtime.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            start: Instant::now(),
        }
    }

    /// Creates a timer on the runtime of the calling context.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Timer for TokioTimer {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn call_later(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let task = self.handle.spawn(async move {
            ::tokio::time::sleep(delay).await;
            callback();
        });
        let abort = task.abort_handle();
        TimerHandle::new().on_cancel(move || abort.abort())
    }
}
