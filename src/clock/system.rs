//! Real-time timer backed by a worker thread.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{Timer, TimerCallback, TimerHandle};

/// A [`Timer`] that fires callbacks from a single worker thread.
///
/// The worker waits on a deadline heap and exits as soon as nothing live is
/// scheduled; the next `call_later` starts a new one. Cancelling a handle
/// wakes the worker so the entry is dropped right away.
///
/// Callbacks run on the worker, one at a time, so anything they touch must
/// be thread-safe; every engine type is.
#[derive(Clone)]
pub struct SystemTimer {
    start: Instant,
    shared: Arc<Shared>,
}

struct Shared {
    queue: Mutex<Queue>,
    wakeup: Condvar,
}

#[derive(Default)]
struct Queue {
    pending: BinaryHeap<Scheduled>,
    next_id: u64,
    /// A worker thread is serving the queue.
    worker: bool,
}

struct Scheduled {
    deadline: Instant,
    id: u64,
    handle: TimerHandle,
    callback: TimerCallback,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earliest deadline on top of the max-heap.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl Queue {
    fn prune(&mut self) {
        self.pending.retain(|entry| !entry.handle.is_cancelled());
    }
}

impl SystemTimer {
    /// Creates a timer whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue::default()),
                wakeup: Condvar::new(),
            }),
        }
    }

    /// Returns the number of live callbacks not yet fired.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared
            .queue
            .lock()
            .pending
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    /// Returns `true` while a worker thread is serving the queue.
    #[must_use]
    pub fn has_worker(&self) -> bool {
        self.shared.queue.lock().worker
    }
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemTimer")
            .field("now", &self.start.elapsed())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Timer for SystemTimer {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn call_later(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let weak = Arc::downgrade(&self.shared);
        let handle = TimerHandle::new().on_cancel(move || {
            if let Some(shared) = weak.upgrade() {
                let _queue = shared.queue.lock();
                shared.wakeup.notify_one();
            }
        });

        let mut queue = self.shared.queue.lock();
        let id = queue.next_id;
        queue.next_id += 1;
        queue.pending.push(Scheduled {
            deadline: Instant::now() + delay,
            id,
            handle: handle.clone(),
            callback,
        });

        if queue.worker {
            self.shared.wakeup.notify_one();
            return handle;
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("deferunit-timer".to_string())
            .spawn(move || run_worker(&shared));
        match spawned {
            Ok(_) => queue.worker = true,
            Err(err) => {
                // Fire early rather than never: a hung test then times out
                // at once instead of blocking the run.
                tracing::error!(error = %err, ?delay, "failed to spawn timer thread; firing now");
                let due: Vec<_> = std::mem::take(&mut queue.pending).into_sorted_vec();
                drop(queue);
                for entry in due.into_iter().rev() {
                    fire(entry);
                }
            }
        }
        handle
    }
}

fn run_worker(shared: &Shared) {
    let mut queue = shared.queue.lock();
    loop {
        queue.prune();
        let Some(deadline) = queue.pending.peek().map(|e| e.deadline) else {
            queue.worker = false;
            tracing::trace!("timer worker idle; exiting");
            return;
        };
        if deadline > Instant::now() {
            shared.wakeup.wait_until(&mut queue, deadline);
            continue;
        }
        if let Some(entry) = queue.pending.pop() {
            MutexGuard::unlocked(&mut queue, || fire(entry));
        }
    }
}

fn fire(entry: Scheduled) {
    if entry.handle.is_cancelled() {
        return;
    }
    if catch_unwind(AssertUnwindSafe(entry.callback)).is_err() {
        tracing::error!("timer callback panicked");
    }
}
