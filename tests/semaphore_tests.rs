//! Fairness and balance of the deferred semaphore.

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use deferunit::deferred::Step;
use deferunit::sync::Semaphore;
use deferunit::Error;
use parking_lot::Mutex;

use common::init_test_logging;

#[test]
fn test_waiters_served_fifo_once_each() {
    init_test_logging();
    let lock = Semaphore::new(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    for name in ["X", "Y", "Z"] {
        let order = Arc::clone(&order);
        lock.acquire().add_callback(move |held: Semaphore| {
            order.lock().push(name);
            Step::value(held)
        });
    }
    assert_eq!(*order.lock(), vec!["X"]);
    assert_eq!(lock.waiting(), 2);

    lock.release();
    assert_eq!(*order.lock(), vec!["X", "Y"]);
    lock.release();
    assert_eq!(*order.lock(), vec!["X", "Y", "Z"]);
    assert_eq!(lock.waiting(), 0);
    assert_eq!(lock.available(), 0);

    lock.release();
    assert_eq!(lock.available(), 1);
    assert_eq!(*order.lock(), vec!["X", "Y", "Z"]);
}

#[test]
fn test_release_hands_slot_over_without_idling() {
    let lock = Semaphore::new(2);
    let _a = lock.acquire();
    let _b = lock.acquire();
    let c = lock.acquire();
    assert_eq!(lock.available(), 0);
    assert!(!c.is_resolved());

    lock.release();
    assert!(c.is_resolved());
    assert_eq!(lock.available(), 0);
}

#[test]
fn test_over_release_is_fatal() {
    let lock = Semaphore::new(1);
    let held = lock.acquire();
    assert!(held.is_resolved());
    lock.release();

    let payload = catch_unwind(AssertUnwindSafe(|| lock.release())).unwrap_err();
    assert_eq!(
        payload.downcast_ref::<Error>(),
        Some(&Error::ReleasedTooManyTimes { capacity: 1 })
    );
    assert_eq!(lock.available(), 1);
}

#[test]
fn test_release_on_fresh_semaphore_is_fatal() {
    let lock = Semaphore::new(3);
    let payload = catch_unwind(AssertUnwindSafe(|| lock.release())).unwrap_err();
    assert!(payload.is::<Error>());
}

#[test]
fn test_zero_capacity_is_fatal() {
    let payload = catch_unwind(|| Semaphore::new(0)).unwrap_err();
    assert_eq!(payload.downcast_ref::<Error>(), Some(&Error::ZeroCapacity));
}
