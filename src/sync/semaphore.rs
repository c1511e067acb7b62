//! Counting semaphore with deferred acquisition.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::deferred::Deferred;
use crate::error::Error;

/// A counting semaphore whose acquisitions are deferreds.
///
/// `acquire` never blocks. A slot released while others are queued is handed
/// straight to the longest waiter, so it never idles between holders.
///
/// Granting a slot runs the waiter's continuations, which may release the
/// slot again before returning. Such nested releases only queue their
/// hand-off; the outermost `release` grants them one after another, so the
/// stack stays flat however many holders finish synchronously in a row.
///
/// # Example
///
/// ```rust
/// use deferunit::sync::Semaphore;
///
/// let lock = Semaphore::new(1);
/// let first = lock.acquire();
/// let second = lock.acquire();
///
/// assert!(first.is_resolved());
/// assert!(!second.is_resolved());
///
/// lock.release();
/// assert!(second.is_resolved());
/// ```
#[derive(Clone)]
pub struct Semaphore {
    inner: Arc<SemaphoreInner>,
}

struct SemaphoreInner {
    state: Mutex<SemaphoreState>,
    /// Maximum slots (initial count).
    capacity: usize,
}

struct SemaphoreState {
    available: usize,
    waiters: VecDeque<Deferred<Semaphore>>,
    /// Waiters already given a slot but not yet resolved.
    granted: VecDeque<Deferred<Semaphore>>,
    /// A `release` is resolving `granted` further up the stack.
    draining: bool,
}

impl Semaphore {
    /// Creates a semaphore with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Raises [`Error::ZeroCapacity`] if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            Error::ZeroCapacity.raise();
        }
        Self {
            inner: Arc::new(SemaphoreInner {
                state: Mutex::new(SemaphoreState {
                    available: capacity,
                    waiters: VecDeque::new(),
                    granted: VecDeque::new(),
                    draining: false,
                }),
                capacity,
            }),
        }
    }

    /// Requests a slot.
    ///
    /// The returned deferred resolves with this semaphore once the slot is
    /// held: synchronously if one is free, otherwise when it reaches the
    /// head of the wait queue.
    #[must_use]
    pub fn acquire(&self) -> Deferred<Semaphore> {
        let d = Deferred::new();
        let granted = {
            let mut state = self.inner.state.lock();
            if state.available > 0 {
                state.available -= 1;
                tracing::trace!(available = state.available, "semaphore slot acquired");
                true
            } else {
                state.waiters.push_back(d.clone());
                tracing::trace!(waiters = state.waiters.len(), "semaphore acquisition queued");
                false
            }
        };
        if granted {
            d.resolve(self.clone());
        }
        d
    }

    /// Returns a slot, handing it to the head waiter if there is one.
    ///
    /// # Panics
    ///
    /// Raises [`Error::ReleasedTooManyTimes`] if every slot is already free.
    pub fn release(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.available >= self.inner.capacity {
                drop(state);
                Error::ReleasedTooManyTimes {
                    capacity: self.inner.capacity,
                }
                .raise();
            }
            match state.waiters.pop_front() {
                // The freed slot goes straight to the waiter.
                Some(waiter) => state.granted.push_back(waiter),
                None => {
                    state.available += 1;
                    tracing::trace!(available = state.available, "semaphore slot released");
                }
            }
            if state.draining {
                return;
            }
            state.draining = true;
        }
        self.drain_granted();
    }

    /// Resolves granted waiters until none are left.
    fn drain_granted(&self) {
        let _unwinding = DrainGuard(self);
        loop {
            let next = {
                let mut state = self.inner.state.lock();
                let next = state.granted.pop_front();
                // Cleared under the same lock a nested release checks it.
                state.draining = next.is_some();
                next
            };
            let Some(waiter) = next else {
                return;
            };
            tracing::trace!("semaphore slot handed to next waiter");
            waiter.resolve(self.clone());
        }
    }

    /// Returns the number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.inner.state.lock().available
    }

    /// Returns the fixed number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the number of queued acquisitions.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.inner.state.lock().waiters.len()
    }
}

/// Clears the draining flag when resolving a waiter unwinds, so the next
/// `release` picks up whatever is still granted.
struct DrainGuard<'a>(&'a Semaphore);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.inner.state.lock().draining = false;
        }
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Semaphore")
            .field("available", &state.available)
            .field("capacity", &self.inner.capacity)
            .field("waiting", &state.waiters.len())
            .finish()
    }
}
