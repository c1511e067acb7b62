//! One test method's lifecycle.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{RunContext, Runnable};
use crate::case::{Body, TestCase, TestContext, TestId, TestMethod};
use crate::clock::{Timer, TimerHandle};
use crate::deferred::{Deferred, Outcome};
use crate::error::{isolate, Failure};
use crate::result::TestResult;

/// Where a unit is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Not started.
    Created,
    /// Fixture creation and `set_up`.
    SettingUp,
    /// The test body.
    Running,
    /// Waiting for an asynchronous body or the watchdog.
    AwaitingAsync,
    /// `tear_down`.
    TearingDown,
    /// Outcome recorded.
    Reported,
}

impl Phase {
    /// Returns `true` if a unit in this phase may move to `next`.
    #[must_use]
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Created, Phase::SettingUp)
                | (Phase::SettingUp, Phase::Running | Phase::Reported)
                | (Phase::Running, Phase::AwaitingAsync | Phase::TearingDown)
                | (Phase::AwaitingAsync, Phase::TearingDown)
                | (Phase::TearingDown, Phase::Reported)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Created => write!(f, "created"),
            Phase::SettingUp => write!(f, "setting-up"),
            Phase::Running => write!(f, "running"),
            Phase::AwaitingAsync => write!(f, "awaiting-async"),
            Phase::TearingDown => write!(f, "tearing-down"),
            Phase::Reported => write!(f, "reported"),
        }
    }
}

/// A runnable unit for one method of test class `C`.
///
/// Every run builds a fresh fixture through [`TestCase::create`], then walks
/// `set_up`, the body and `tear_down`, reporting exactly once into the run's
/// [`TestResult`]:
///
/// - a `set_up` failure is an error and skips the body and teardown
/// - a body failure is a failure or an error by kind, and teardown still runs
/// - an asynchronous body that outlives the watchdog is a timeout error
/// - a `tear_down` failure is an additional error
/// - the test counts as a success only if the body and teardown both passed
pub struct CaseUnit<C> {
    id: TestId,
    method: TestMethod<C>,
    _case: PhantomData<fn() -> C>,
}

impl<C: TestCase> CaseUnit<C> {
    /// Creates a unit running `method` under `id`.
    #[must_use]
    pub fn new(id: TestId, method: TestMethod<C>) -> Self {
        Self {
            id,
            method,
            _case: PhantomData,
        }
    }

    /// The unit's identity.
    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }
}

impl<C> fmt::Debug for CaseUnit<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseUnit").field("id", &self.id).finish()
    }
}

impl<C: TestCase> Runnable for CaseUnit<C> {
    fn id(&self) -> &TestId {
        &self.id
    }

    fn run(&self, ctx: &RunContext) -> Deferred<()> {
        let execution = Arc::new(Execution::<C>::new(self.id.clone(), ctx.result().clone()));
        execution.result.start_test(&execution.id);

        execution.enter(Phase::SettingUp);
        let fixture = TestContext::new(self.id.clone(), ctx.timer());
        let prepared = isolate(|| {
            let mut case = C::create(&fixture);
            case.set_up()?;
            Ok(case)
        });
        match prepared {
            Ok(case) => *execution.case.lock() = Some(case),
            Err(failure) => {
                execution.enter(Phase::Reported);
                execution.result.add_error(&execution.id, &failure);
                execution.result.stop_test(&execution.id);
                return Deferred::succeeded(());
            }
        }

        execution.enter(Phase::Running);
        let method = self.method;
        match execution.with_case(method) {
            Ok(Body::Done) => {
                execution.finish(None);
                Deferred::succeeded(())
            }
            Err(failure) => {
                execution.finish(Some(failure));
                Deferred::succeeded(())
            }
            Ok(Body::Async(body)) => execution.await_async(body, ctx.timer(), ctx.watchdog()),
        }
    }
}

/// State of one run of a unit, shared with the async body and the watchdog.
struct Execution<C> {
    id: TestId,
    result: TestResult,
    phase: Mutex<Phase>,
    case: Mutex<Option<C>>,
}

impl<C: TestCase> Execution<C> {
    fn new(id: TestId, result: TestResult) -> Self {
        Self {
            id,
            result,
            phase: Mutex::new(Phase::Created),
            case: Mutex::new(None),
        }
    }

    fn enter(&self, next: Phase) {
        let mut phase = self.phase.lock();
        debug_assert!(
            phase.can_advance_to(next),
            "invalid phase transition {} -> {next} for {}",
            *phase,
            self.id
        );
        tracing::trace!(test = %self.id, from = %*phase, to = %next, "phase transition");
        *phase = next;
    }

    /// Runs `f` on the fixture, turning a panic into a failure.
    fn with_case<R>(&self, f: impl FnOnce(&mut C) -> Result<R, Failure>) -> Result<R, Failure> {
        let mut case = self.case.lock();
        match case.as_mut() {
            Some(case) => isolate(|| f(case)),
            None => Err(Failure::error(format!("{} has no fixture", self.id))),
        }
    }

    /// Tears down and records the outcome of a body that ended with `body`.
    fn finish(&self, body: Option<Failure>) {
        self.enter(Phase::TearingDown);
        let teardown = self.with_case(C::tear_down);
        self.case.lock().take();

        self.enter(Phase::Reported);
        if let Some(failure) = &body {
            self.result.add_outcome(&self.id, failure);
        }
        match teardown {
            Err(failure) => self.result.add_error(&self.id, &failure),
            Ok(()) if body.is_none() => self.result.add_success(&self.id),
            Ok(()) => {}
        }
        self.result.stop_test(&self.id);
    }

    /// Races `body` against the watchdog. Whichever settles first finishes
    /// the unit; the other is ignored. A body that wins cancels the watchdog.
    fn await_async(
        self: &Arc<Self>,
        body: Deferred<()>,
        timer: Arc<dyn Timer>,
        watchdog: Duration,
    ) -> Deferred<()> {
        self.enter(Phase::AwaitingAsync);
        let done = Deferred::new();
        let settled = Arc::new(AtomicBool::new(false));
        let alarm: Arc<Mutex<Option<TimerHandle>>> = Arc::default();

        {
            let execution = Arc::clone(self);
            let done = done.clone();
            let settled = Arc::clone(&settled);
            let alarm = Arc::clone(&alarm);
            body.add_both(move |outcome: Outcome<()>| {
                if settled.swap(true, Ordering::AcqRel) {
                    tracing::debug!(test = %execution.id, "async body settled after watchdog");
                } else {
                    if let Some(handle) = alarm.lock().take() {
                        handle.cancel();
                    }
                    execution.finish(outcome.as_ref().err().cloned());
                    done.resolve(());
                }
                outcome
            });
        }

        if !settled.load(Ordering::Acquire) {
            let execution = Arc::clone(self);
            let done = done.clone();
            let fired = Arc::clone(&settled);
            let handle = timer.call_later(
                watchdog,
                Box::new(move || {
                    if fired.swap(true, Ordering::AcqRel) {
                        return;
                    }
                    tracing::warn!(test = %execution.id, ?watchdog, "async test timed out");
                    body.cancel();
                    execution.finish(Some(Failure::Timeout(watchdog)));
                    done.resolve(());
                }),
            );
            *alarm.lock() = Some(handle);
            // The body may have won on another thread before the handle was stored.
            if settled.load(Ordering::Acquire) {
                if let Some(handle) = alarm.lock().take() {
                    handle.cancel();
                }
            }
        }
        done
    }
}
