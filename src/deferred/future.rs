//! Bridging a `Deferred` into `std::future::Future`.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use super::{Deferred, Outcome};

struct Slot<T> {
    outcome: Option<Outcome<T>>,
    waker: Option<Waker>,
}

/// A future that completes with the eventual result of a [`Deferred`] chain.
///
/// Created through [`IntoFuture`]; awaiting a deferred consumes its result.
///
/// # Example
///
/// ```rust
/// use std::future::IntoFuture;
/// use deferunit::deferred::Deferred;
///
/// let d = Deferred::succeeded(3);
/// let outcome = futures::executor::block_on(d.into_future());
/// assert_eq!(outcome.unwrap(), 3);
/// ```
pub struct DeferredFuture<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = Outcome<T>;
    type IntoFuture = DeferredFuture<T>;

    fn into_future(self) -> Self::IntoFuture {
        let slot = Arc::new(Mutex::new(Slot {
            outcome: None,
            waker: None,
        }));
        let filled = Arc::clone(&slot);
        self.chain(move |outcome| {
            let waker = {
                let mut slot = filled.lock();
                slot.outcome = Some(outcome);
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        });
        DeferredFuture { slot }
    }
}

impl<T> Future for DeferredFuture<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();
        match slot.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                slot.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T> std::fmt::Debug for DeferredFuture<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredFuture")
            .field("ready", &self.slot.lock().outcome.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Step;
    use crate::error::Failure;

    fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        Pin::new(future).poll(&mut cx)
    }

    #[test]
    fn test_pending_until_resolved() {
        let d: Deferred<i32> = Deferred::new();
        let mut future = d.clone().into_future();
        assert!(poll_once(&mut future).is_pending());

        d.resolve(5);
        assert!(matches!(poll_once(&mut future), Poll::Ready(Ok(5))));
    }

    #[test]
    fn test_failure_is_delivered() {
        let d: Deferred<()> = Deferred::failed(Failure::error("bad"));
        let outcome = futures::executor::block_on(d.into_future());
        assert_eq!(outcome.unwrap_err().to_string(), "bad");
    }

    #[test]
    fn test_sees_end_of_chain() {
        let d: Deferred<i32> = Deferred::new();
        d.add_callback(|x| Step::value(x + 100));
        let future = d.clone().into_future();
        d.resolve(1);
        assert_eq!(futures::executor::block_on(future).unwrap(), 101);
    }
}
