//! `MockClock` implementation for virtual time control.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Timer, TimerCallback, TimerHandle};

/// A mock clock that provides virtual time control for async tests.
///
/// Scheduled callbacks fire only when the clock is advanced past their
/// deadline, in deadline order (ties in scheduling order). Cancelled ones
/// are dropped when they come due. Callbacks run
/// without the clock lock held, so they may schedule further callbacks;
/// any that fall due within the same advance fire before it returns.
///
/// # Thread Safety
///
/// `MockClock` is thread-safe and can be cloned and shared across threads.
/// All clones share the same underlying time state.
///
/// # Example
///
/// ```rust
/// use deferunit::clock::MockClock;
/// use std::time::Duration;
///
/// let clock = MockClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), Duration::from_secs(10));
///
/// // Clone shares the same time
/// let clock2 = clock.clone();
/// clock2.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), Duration::from_secs(15));
/// ```
#[derive(Clone)]
pub struct MockClock {
    inner: Arc<ClockInner>,
}

struct ClockInner {
    /// Current time as duration since clock creation
    current_time: Mutex<Duration>,
    timers: Mutex<TimerQueue>,
}

/// A scheduled callback in the timer queue.
struct TimerEntry {
    deadline: Duration,
    /// Scheduling order, breaks deadline ties
    id: u64,
    handle: TimerHandle,
    callback: TimerCallback,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap behavior (earliest deadline first)
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Default)]
struct TimerQueue {
    pending: BinaryHeap<TimerEntry>,
    next_id: u64,
}

impl TimerQueue {
    fn push(&mut self, deadline: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let handle = TimerHandle::new();
        self.pending.push(TimerEntry {
            deadline,
            id,
            handle: handle.clone(),
            callback,
        });
        handle
    }

    /// Drops cancelled entries from the front of the queue.
    fn prune(&mut self) {
        while self.pending.peek().is_some_and(|e| e.handle.is_cancelled()) {
            self.pending.pop();
        }
    }

    fn pop_due(&mut self, now: Duration) -> Option<TimerEntry> {
        self.prune();
        if self.pending.peek()?.deadline <= now {
            self.pending.pop()
        } else {
            None
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Creates a new `MockClock` starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::with_start_time(Duration::ZERO)
    }

    /// Creates a new `MockClock` starting at the specified time.
    ///
    /// # Example
    ///
    /// ```rust
    /// use deferunit::clock::MockClock;
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::with_start_time(Duration::from_secs(100));
    /// assert_eq!(clock.now(), Duration::from_secs(100));
    /// ```
    #[must_use]
    pub fn with_start_time(start: Duration) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                current_time: Mutex::new(start),
                timers: Mutex::new(TimerQueue::default()),
            }),
        }
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        *self.inner.current_time.lock()
    }

    /// Advances the clock by the specified duration, firing every callback
    /// whose deadline is reached.
    pub fn advance(&self, duration: Duration) {
        let new_time = {
            let mut now = self.inner.current_time.lock();
            *now += duration;
            *now
        };
        self.fire_due(new_time);
    }

    /// Advances the clock to a specific time.
    ///
    /// This method only moves time forward - if the specified time
    /// is less than or equal to the current time, no time passes, though
    /// callbacks already due still fire.
    ///
    /// # Example
    ///
    /// ```rust
    /// use deferunit::clock::MockClock;
    /// use std::time::Duration;
    ///
    /// let clock = MockClock::new();
    /// clock.advance_to(Duration::from_secs(10));
    /// assert_eq!(clock.now(), Duration::from_secs(10));
    ///
    /// // Trying to go backwards is a no-op
    /// clock.advance_to(Duration::from_secs(5));
    /// assert_eq!(clock.now(), Duration::from_secs(10));
    /// ```
    pub fn advance_to(&self, time: Duration) {
        let new_time = {
            let mut now = self.inner.current_time.lock();
            if time > *now {
                *now = time;
            }
            *now
        };
        self.fire_due(new_time);
    }

    /// Jumps to the earliest pending deadline and fires what is due there.
    ///
    /// Returns `false` if nothing was scheduled.
    pub fn advance_to_next(&self) -> bool {
        match self.next_deadline() {
            Some(deadline) => {
                self.advance_to(deadline);
                true
            }
            None => false,
        }
    }

    /// Advances through every pending deadline until the queue is empty.
    ///
    /// Returns the number of jumps taken.
    ///
    /// # Panics
    ///
    /// Panics if callbacks keep rescheduling forever.
    pub fn run_until_idle(&self) -> usize {
        let max_iterations = 100_000;
        let mut count = 0;
        while self.advance_to_next() {
            count += 1;
            assert!(
                count <= max_iterations,
                "MockClock fired {max_iterations} deadlines without going idle"
            );
        }
        count
    }

    /// Returns the earliest deadline of a callback that was not cancelled.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        let mut timers = self.inner.timers.lock();
        timers.prune();
        timers.pending.peek().map(|e| e.deadline)
    }

    /// Returns the number of live callbacks waiting for their deadline.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner
            .timers
            .lock()
            .pending
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    fn fire_due(&self, now: Duration) {
        loop {
            // Pop under the lock, run outside it: callbacks may schedule more.
            let Some(entry) = self.inner.timers.lock().pop_due(now) else {
                break;
            };
            tracing::trace!(deadline = ?entry.deadline, "mock timer fired");
            (entry.callback)();
        }
    }
}

impl Timer for MockClock {
    fn now(&self) -> Duration {
        MockClock::now(self)
    }

    fn call_later(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let deadline = self.now() + delay;
        self.inner.timers.lock().push(deadline, callback)
    }
}

impl std::fmt::Debug for MockClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClock")
            .field("now", &self.now())
            .field("pending", &self.pending_count())
            .finish()
    }
}
