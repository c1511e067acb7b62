//! Timer sources for asynchronous tests and the watchdog.
//!
//! The engine never sleeps. Anything that must happen later (a watchdog
//! firing, a test resolving its deferred after a delay) is scheduled through
//! a [`Timer`]. Three sources are provided:
//!
//! - [`MockClock`] - virtual time, advanced explicitly; fully deterministic
//! - [`SystemTimer`] - real time, fired from one worker thread that exits when idle
//! - `TokioTimer` - real time on a tokio runtime (with the `tokio` feature)
//!
//! # Example
//!
//! ```rust
//! use deferunit::clock::{MockClock, Timer};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = MockClock::new();
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&fired);
//! clock.call_later(Duration::from_secs(5), Box::new(move || flag.store(true, Ordering::SeqCst)));
//!
//! let skipped = clock.call_later(Duration::from_secs(1), Box::new(|| unreachable!()));
//! skipped.cancel();
//!
//! clock.advance(Duration::from_secs(5));
//! assert!(fired.load(Ordering::SeqCst));
//! ```

mod mock_clock;
mod system;
#[cfg(feature = "tokio")]
mod tokio;

pub use mock_clock::MockClock;
pub use system::SystemTimer;
#[cfg(feature = "tokio")]
pub use self::tokio::TokioTimer;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A deferred piece of work scheduled on a [`Timer`].
pub type TimerCallback = Box<dyn FnOnce() + Send>;

/// A source of time that can run callbacks after a delay.
pub trait Timer: Send + Sync {
    /// Current time as a duration since the timer's epoch.
    fn now(&self) -> Duration;

    /// Runs `callback` once `delay` has elapsed, unless the returned handle
    /// is cancelled first.
    fn call_later(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

/// Cancels a callback scheduled with [`Timer::call_later`].
///
/// Clones share the same flag. Timers check it right before firing, so a
/// cancelled callback never runs; cancelling one that already ran does
/// nothing.
#[derive(Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    on_cancel: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl TimerHandle {
    /// Creates a live handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `wake` the first time the handle is cancelled, so a timer can
    /// drop the callback without waiting for its deadline.
    #[must_use]
    pub fn on_cancel(mut self, wake: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_cancel = Some(Arc::new(wake));
        self
    }

    /// Prevents the callback from running.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            if let Some(wake) = &self.on_cancel {
                wake();
            }
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
