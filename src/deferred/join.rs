//! Combinators over several deferreds.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Deferred, Outcome};
use crate::clock::Timer;

/// Waits for every deferred in `deferreds` to settle.
///
/// The returned deferred never fails: it resolves with each input's outcome,
/// in input order, once the last one has settled. An empty input resolves
/// immediately. Each input is consumed.
pub fn join_all<T: Send + 'static>(deferreds: Vec<Deferred<T>>) -> Deferred<Vec<Outcome<T>>> {
    let joined = Deferred::new();
    if deferreds.is_empty() {
        joined.resolve(Vec::new());
        return joined;
    }

    struct Gather<T> {
        slots: Vec<Option<Outcome<T>>>,
        remaining: usize,
    }

    let gather = Arc::new(Mutex::new(Gather {
        slots: (0..deferreds.len()).map(|_| None).collect(),
        remaining: deferreds.len(),
    }));

    for (index, deferred) in deferreds.into_iter().enumerate() {
        let gather = Arc::clone(&gather);
        let joined = joined.clone();
        deferred.chain(move |outcome| {
            let finished = {
                let mut gather = gather.lock();
                gather.slots[index] = Some(outcome);
                gather.remaining -= 1;
                if gather.remaining == 0 {
                    Some(gather.slots.drain(..).flatten().collect::<Vec<_>>())
                } else {
                    None
                }
            };
            if let Some(outcomes) = finished {
                joined.resolve(outcomes);
            }
        });
    }
    joined
}

/// Returns a deferred that resolves with `value` after `delay` on `timer`.
pub fn later<T: Send + 'static>(timer: &dyn Timer, delay: Duration, value: T) -> Deferred<T> {
    let d = Deferred::new();
    let fire = d.clone();
    timer.call_later(delay, Box::new(move || fire.resolve(value)));
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::IntoFuture;

    use crate::clock::MockClock;
    use crate::error::Failure;

    #[test]
    fn test_join_all_empty() {
        let joined = join_all::<()>(Vec::new());
        assert!(joined.is_resolved());
    }

    #[test]
    fn test_join_all_waits_for_last() {
        let a = Deferred::new();
        let b = Deferred::new();
        let joined = join_all(vec![a.clone(), b.clone()]);

        b.reject(Failure::error("b failed"));
        assert!(!joined.is_resolved());

        a.resolve(1);
        let outcomes = futures::executor::block_on(joined.into_future()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(*outcomes[0].as_ref().unwrap(), 1);
        assert!(outcomes[1].is_err());
    }

    #[test]
    fn test_later_fires_on_advance() {
        let clock = MockClock::new();
        let d = later(&clock, Duration::from_millis(10), "done");
        assert!(!d.is_resolved());

        clock.advance(Duration::from_millis(9));
        assert!(!d.is_resolved());

        clock.advance(Duration::from_millis(1));
        assert!(d.is_resolved());
    }
}
