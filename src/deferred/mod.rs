//! Single-resolution futures with ordered success/failure continuations.
//!
//! A [`Deferred`] is resolved exactly once, with either a value or a
//! [`Failure`]. Continuations attached to it run in attachment order; each
//! one sees the result produced by the previous one, and only the branch that
//! matches the current result kind is invoked (the other branch passes the
//! result through untouched).
//!
//! A continuation may hand back another `Deferred` through [`Step::Pending`].
//! The outer chain then pauses until the inner one settles and resumes with
//! the inner result, so nested asynchronous work composes without blocking.
//!
//! # Example
//!
//! ```rust
//! use deferunit::deferred::{Deferred, Step};
//!
//! let d = Deferred::new();
//! let inner = Deferred::new();
//! let waiting = inner.clone();
//!
//! d.add_callback(|x: i32| Step::value(x + 1))
//!     .add_callback(move |_| Step::wait(waiting))
//!     .add_callback(|x| Step::value(x * 10));
//!
//! d.resolve(1);
//! assert!(d.is_paused());
//!
//! inner.resolve(4);
//! assert!(!d.is_paused());
//! assert_eq!(d.pending_callbacks(), 0);
//! ```

mod future;
mod join;

pub use future::DeferredFuture;
pub use join::{join_all, later};

use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Failure};

/// The settled result carried along a continuation chain.
pub type Outcome<T> = std::result::Result<T, Failure>;

/// What a continuation produced: a plain result, or a nested deferred to wait on.
pub enum Step<T> {
    /// The chain continues immediately with this result.
    Ready(Outcome<T>),
    /// The chain pauses until this deferred settles, then continues with its result.
    Pending(Deferred<T>),
}

impl<T> Step<T> {
    /// Continue with a success value.
    pub fn value(value: T) -> Self {
        Self::Ready(Ok(value))
    }

    /// Continue with a failure.
    pub fn fail(failure: Failure) -> Self {
        Self::Ready(Err(failure))
    }

    /// Pause until `deferred` settles.
    pub fn wait(deferred: Deferred<T>) -> Self {
        Self::Pending(deferred)
    }
}

impl<T> From<Outcome<T>> for Step<T> {
    fn from(outcome: Outcome<T>) -> Self {
        Self::Ready(outcome)
    }
}

impl<T> From<Deferred<T>> for Step<T> {
    fn from(deferred: Deferred<T>) -> Self {
        Self::Pending(deferred)
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Ready(Ok(_)) => f.write_str("Step::Ready(Ok(..))"),
            Step::Ready(Err(failure)) => write!(f, "Step::Ready(Err({failure:?}))"),
            Step::Pending(_) => f.write_str("Step::Pending(..)"),
        }
    }
}

type SuccessFn<T> = Box<dyn FnOnce(T) -> Step<T> + Send>;
type FailureFn<T> = Box<dyn FnOnce(Failure) -> Step<T> + Send>;
type BothFn<T> = Box<dyn FnOnce(Outcome<T>) -> Step<T> + Send>;
type ChainFn<T> = Box<dyn FnOnce(Outcome<T>) + Send>;

/// One queued continuation.
///
/// A missing branch behaves as identity: the result passes through unchanged.
enum Callback<T> {
    Success(SuccessFn<T>),
    Failure(FailureFn<T>),
    Pair(SuccessFn<T>, FailureFn<T>),
    Both(BothFn<T>),
    /// Takes the result away for good; the deferred is spent afterwards.
    Chain(ChainFn<T>),
}

enum Invoked<T> {
    Step(Step<T>),
    Consumed,
}

impl<T> Callback<T> {
    fn invoke(self, outcome: Outcome<T>) -> Invoked<T> {
        let step = match (self, outcome) {
            (Callback::Success(f) | Callback::Pair(f, _), Ok(value)) => f(value),
            (Callback::Failure(f) | Callback::Pair(_, f), Err(failure)) => f(failure),
            (Callback::Both(f), outcome) => f(outcome),
            (Callback::Chain(f), outcome) => {
                f(outcome);
                return Invoked::Consumed;
            }
            (Callback::Success(_), outcome @ Err(_)) | (Callback::Failure(_), outcome @ Ok(_)) => {
                Step::Ready(outcome)
            }
        };
        Invoked::Step(step)
    }
}

struct State<T> {
    /// Set once by the first resolution.
    called: bool,
    /// Current result; taken while a continuation holds it.
    result: Option<Outcome<T>>,
    callbacks: VecDeque<Callback<T>>,
    /// Number of nested deferreds this chain is waiting on.
    paused: usize,
    /// Reentrancy guard for the callback loop.
    running: bool,
    /// The result was handed off through a chain continuation.
    consumed: bool,
}

/// A single-resolution future with chainable continuations.
///
/// `Deferred` is a cheap, cloneable handle: clones observe and drive the same
/// chain. The internal lock is never held while a continuation runs, so a
/// continuation may freely attach to, resolve, or cancel any deferred,
/// including the one it is running on.
///
/// A panic inside a continuation becomes the chain's new failure result (see
/// [`Failure::from_panic`]); a panic carrying a scheduler [`Error`] is
/// re-raised.
pub struct Deferred<T> {
    inner: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Deferred<T> {
    /// Creates an unresolved deferred.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                called: false,
                result: None,
                callbacks: VecDeque::new(),
                paused: 0,
                running: false,
                consumed: false,
            })),
        }
    }

    /// Creates a deferred already resolved with `value`.
    #[must_use]
    pub fn succeeded(value: T) -> Self {
        let d = Self::new();
        d.resolve(value);
        d
    }

    /// Creates a deferred already rejected with `failure`.
    #[must_use]
    pub fn failed(failure: Failure) -> Self {
        let d = Self::new();
        d.reject(failure);
        d
    }

    /// Resolves with a success value and runs the queued continuations.
    ///
    /// # Panics
    ///
    /// Raises [`Error::AlreadyResolved`] if this deferred was already resolved.
    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    /// Resolves with a failure and runs the queued continuations.
    ///
    /// # Panics
    ///
    /// Raises [`Error::AlreadyResolved`] if this deferred was already resolved.
    pub fn reject(&self, failure: Failure) {
        self.settle(Err(failure));
    }

    /// Resolves with either kind of result.
    ///
    /// # Panics
    ///
    /// Raises [`Error::AlreadyResolved`] if this deferred was already resolved.
    pub fn settle(&self, outcome: Outcome<T>) {
        {
            let mut state = self.inner.lock();
            if state.called {
                drop(state);
                Error::AlreadyResolved.raise();
            }
            state.called = true;
            state.result = Some(outcome);
        }
        self.run_callbacks();
    }

    /// Attaches a success continuation; failures pass through it unchanged.
    pub fn add_callback<F, R>(&self, f: F) -> &Self
    where
        F: FnOnce(T) -> R + Send + 'static,
        R: Into<Step<T>>,
    {
        self.push(Callback::Success(Box::new(move |value| f(value).into())))
    }

    /// Attaches a failure continuation; successes pass through it unchanged.
    pub fn add_errback<F, R>(&self, f: F) -> &Self
    where
        F: FnOnce(Failure) -> R + Send + 'static,
        R: Into<Step<T>>,
    {
        self.push(Callback::Failure(Box::new(move |failure| f(failure).into())))
    }

    /// Attaches one continuation for each result kind as a single chain link.
    pub fn add_callbacks<S, E, RS, RE>(&self, on_success: S, on_failure: E) -> &Self
    where
        S: FnOnce(T) -> RS + Send + 'static,
        E: FnOnce(Failure) -> RE + Send + 'static,
        RS: Into<Step<T>>,
        RE: Into<Step<T>>,
    {
        self.push(Callback::Pair(
            Box::new(move |value| on_success(value).into()),
            Box::new(move |failure| on_failure(failure).into()),
        ))
    }

    /// Attaches a continuation that sees every result.
    pub fn add_both<F, R>(&self, f: F) -> &Self
    where
        F: FnOnce(Outcome<T>) -> R + Send + 'static,
        R: Into<Step<T>>,
    {
        self.push(Callback::Both(Box::new(move |outcome| f(outcome).into())))
    }

    /// Hands the eventual result of this chain to `f`, whose own result
    /// settles the returned deferred.
    ///
    /// This is how a chain changes its value type. The result is moved out,
    /// so this deferred is spent once `f` has run; attaching further
    /// continuations to it is a scheduler error.
    pub fn then<U, F, R>(&self, f: F) -> Deferred<U>
    where
        U: Send + 'static,
        F: FnOnce(Outcome<T>) -> R + Send + 'static,
        R: Into<Step<U>>,
    {
        let next = Deferred::new();
        let target = next.clone();
        let isolated = move |outcome: Outcome<T>| -> Step<U> {
            catch_unwind(AssertUnwindSafe(|| -> Step<U> { f(outcome).into() }))
                .unwrap_or_else(|payload| Step::Ready(Err(Failure::from_panic(payload))))
        };
        self.push(Callback::Chain(Box::new(move |outcome| {
            match isolated(outcome) {
                Step::Ready(outcome) => target.settle(outcome),
                Step::Pending(inner) => inner.forward_to(target),
            }
        })));
        next
    }

    /// Drops every pending continuation without resolving.
    ///
    /// Used to abandon a chain whose owner gave up on it. Code that is
    /// already running is not interrupted.
    pub fn cancel(&self) {
        let dropped = {
            let mut state = self.inner.lock();
            std::mem::take(&mut state.callbacks)
        };
        if !dropped.is_empty() {
            tracing::debug!(dropped = dropped.len(), "deferred chain cancelled");
        }
    }

    /// Returns `true` once the deferred has been resolved or rejected.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.inner.lock().called
    }

    /// Returns `true` while the chain waits on a nested deferred.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused > 0
    }

    /// Returns the number of continuations not yet run.
    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.inner.lock().callbacks.len()
    }

    /// Settles `target` with this chain's eventual result.
    pub(crate) fn forward_to(&self, target: Deferred<T>) {
        self.push(Callback::Chain(Box::new(move |outcome| target.settle(outcome))));
    }

    /// Queues a terminal continuation that takes the result away.
    pub(crate) fn chain<F>(&self, f: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        self.push(Callback::Chain(Box::new(f)));
    }

    fn push(&self, callback: Callback<T>) -> &Self {
        let called = {
            let mut state = self.inner.lock();
            if state.consumed {
                drop(state);
                Error::AlreadyConsumed.raise();
            }
            state.callbacks.push_back(callback);
            state.called
        };
        if called {
            self.run_callbacks();
        }
        self
    }

    fn pause(&self) {
        self.inner.lock().paused += 1;
    }

    fn resume(&self, outcome: Outcome<T>) {
        {
            let mut state = self.inner.lock();
            state.result = Some(outcome);
            state.paused -= 1;
            tracing::trace!(paused = state.paused, "deferred resumed");
        }
        self.run_callbacks();
    }

    fn run_callbacks(&self) {
        {
            let mut state = self.inner.lock();
            if state.running || state.paused > 0 {
                return;
            }
            state.running = true;
        }
        loop {
            let (callback, outcome) = {
                let mut state = self.inner.lock();
                if state.paused > 0 || state.consumed || state.callbacks.is_empty() {
                    state.running = false;
                    return;
                }
                let Some(outcome) = state.result.take() else {
                    state.running = false;
                    return;
                };
                let Some(callback) = state.callbacks.pop_front() else {
                    unreachable!("callback queue checked non-empty under the same lock");
                };
                (callback, outcome)
            };

            let invoked = catch_unwind(AssertUnwindSafe(|| callback.invoke(outcome)))
                .unwrap_or_else(|payload| {
                    Invoked::Step(Step::Ready(Err(Failure::from_panic(payload))))
                });

            match invoked {
                Invoked::Consumed => {
                    let mut state = self.inner.lock();
                    state.consumed = true;
                    let orphaned = std::mem::take(&mut state.callbacks);
                    state.running = false;
                    drop(state);
                    if !orphaned.is_empty() {
                        tracing::warn!(
                            orphaned = orphaned.len(),
                            "continuations queued behind a consuming link were dropped"
                        );
                    }
                    return;
                }
                Invoked::Step(Step::Ready(outcome)) => {
                    self.inner.lock().result = Some(outcome);
                }
                Invoked::Step(Step::Pending(nested)) => {
                    self.pause();
                    tracing::trace!("deferred paused on nested deferred");
                    let outer = self.clone();
                    nested.chain(move |outcome| outer.resume(outcome));
                }
            }
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Deferred")
            .field("resolved", &state.called)
            .field("pending", &state.callbacks.len())
            .field("paused", &state.paused)
            .field("consumed", &state.consumed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Arc::clone(&log), log)
    }

    #[test]
    fn test_new_is_unresolved() {
        let d: Deferred<i32> = Deferred::new();
        assert!(!d.is_resolved());
        assert!(!d.is_paused());
        assert_eq!(d.pending_callbacks(), 0);
    }

    #[test]
    fn test_callbacks_run_in_order() {
        let (log, seen) = recorder();
        let d = Deferred::new();
        for name in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            d.add_callback(move |x: i32| {
                log.lock().push(format!("{name}{x}"));
                Step::value(x + 1)
            });
        }
        d.resolve(0);
        assert_eq!(*seen.lock(), vec!["a0", "b1", "c2"]);
    }

    #[test]
    fn test_late_attachment_runs_immediately() {
        let (log, seen) = recorder();
        let d = Deferred::succeeded(7);
        d.add_callback(move |x: i32| {
            log.lock().push(x.to_string());
            Step::value(x)
        });
        assert_eq!(*seen.lock(), vec!["7"]);
        assert_eq!(d.pending_callbacks(), 0);
    }

    #[test]
    fn test_missing_branch_passes_through() {
        let (log, seen) = recorder();
        let d: Deferred<i32> = Deferred::new();
        let errlog = Arc::clone(&log);
        d.add_errback(move |f| {
            errlog.lock().push(format!("skipped {f}"));
            Step::value(0)
        })
        .add_callback(move |x| {
            log.lock().push(format!("value {x}"));
            Step::value(x)
        });
        d.resolve(3);
        assert_eq!(*seen.lock(), vec!["value 3"]);
    }

    #[test]
    fn test_failure_skips_callbacks_until_errback() {
        let (log, seen) = recorder();
        let d: Deferred<i32> = Deferred::new();
        let cblog = Arc::clone(&log);
        d.add_callback(move |x| {
            cblog.lock().push("callback".into());
            Step::value(x)
        })
        .add_errback(move |f| {
            log.lock().push(format!("errback {f}"));
            Step::value(-1)
        });
        d.reject(Failure::error("nope"));
        assert_eq!(*seen.lock(), vec!["errback nope"]);
    }

    #[test]
    fn test_panicking_continuation_becomes_failure() {
        let (log, seen) = recorder();
        let d: Deferred<i32> = Deferred::new();
        d.add_callback(|_| -> Step<i32> { panic!("exploded") })
            .add_errback(move |f| {
                log.lock().push(f.to_string());
                Step::value(0)
            });
        d.resolve(1);
        assert_eq!(*seen.lock(), vec!["exploded"]);
    }

    #[test]
    fn test_double_resolve_is_fatal() {
        let d = Deferred::succeeded(1);
        let payload = catch_unwind(AssertUnwindSafe(|| d.resolve(2))).unwrap_err();
        assert_eq!(payload.downcast_ref::<Error>(), Some(&Error::AlreadyResolved));
    }

    #[test]
    fn test_nested_deferred_pauses_chain() {
        let (log, seen) = recorder();
        let d = Deferred::new();
        let inner: Deferred<i32> = Deferred::new();
        let waiting = inner.clone();
        d.add_callback(move |_| Step::wait(waiting))
            .add_callback(move |x: i32| {
                log.lock().push(x.to_string());
                Step::value(x)
            });
        d.resolve(1);
        assert!(d.is_paused());
        assert!(seen.lock().is_empty());

        inner.resolve(42);
        assert!(!d.is_paused());
        assert_eq!(*seen.lock(), vec!["42"]);
    }

    #[test]
    fn test_resolved_nested_deferred_continues_synchronously() {
        let (log, seen) = recorder();
        let d = Deferred::new();
        d.add_callback(|x: i32| Step::wait(Deferred::succeeded(x * 2)))
            .add_callback(move |x| {
                log.lock().push(x.to_string());
                Step::value(x)
            });
        d.resolve(5);
        assert!(!d.is_paused());
        assert_eq!(*seen.lock(), vec!["10"]);
    }

    #[test]
    fn test_reentrant_attach_does_not_recurse() {
        let (log, seen) = recorder();
        let d: Deferred<i32> = Deferred::new();
        let handle = d.clone();
        let outer = Arc::clone(&log);
        d.add_callback(move |x| {
            let inner = Arc::clone(&outer);
            handle.add_callback(move |y| {
                inner.lock().push(format!("attached {y}"));
                Step::value(y)
            });
            outer.lock().push("first done".into());
            Step::value(x + 1)
        });
        d.resolve(0);
        assert_eq!(*seen.lock(), vec!["first done", "attached 1"]);
    }

    #[test]
    fn test_cancel_clears_pending() {
        let (log, seen) = recorder();
        let d: Deferred<i32> = Deferred::new();
        d.add_callback(move |x| {
            log.lock().push("ran".into());
            Step::value(x)
        });
        d.cancel();
        assert_eq!(d.pending_callbacks(), 0);
        d.resolve(1);
        assert!(seen.lock().is_empty());
        assert!(d.is_resolved());
    }

    #[test]
    fn test_then_changes_type() {
        let d: Deferred<i32> = Deferred::new();
        let text = d.then(|outcome| outcome.map(|x| format!("#{x}")));
        let (log, seen) = recorder();
        text.add_callback(move |s: String| {
            log.lock().push(s.clone());
            Step::value(s)
        });
        d.resolve(9);
        assert_eq!(*seen.lock(), vec!["#9"]);
    }

    #[test]
    fn test_attach_after_consumed_is_fatal() {
        let d = Deferred::succeeded(1);
        let _next: Deferred<i32> = d.then(|outcome| outcome);
        let payload =
            catch_unwind(AssertUnwindSafe(|| d.add_callback(|x: i32| Step::value(x)).is_resolved()))
                .unwrap_err();
        assert_eq!(payload.downcast_ref::<Error>(), Some(&Error::AlreadyConsumed));
    }

    #[test]
    fn test_debug() {
        let d: Deferred<()> = Deferred::new();
        let debug = format!("{d:?}");
        assert!(debug.contains("Deferred"));
        assert!(debug.contains("resolved: false"));
    }
}
