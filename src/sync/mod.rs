//! Concurrency limiting for test execution.
//!
//! [`Semaphore`] hands out slots as [`Deferred`](crate::deferred::Deferred)s:
//! an acquisition either resolves immediately or waits, strictly first in
//! first out, until a holder releases.

mod semaphore;

pub use semaphore::Semaphore;
