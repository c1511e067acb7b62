//! Recursive suite scheduling.

use std::fmt;
use std::sync::Arc;

use super::{RunContext, Runnable};
use crate::deferred::{join_all, Deferred, Outcome, Step};
use crate::error::isolate;
use crate::sync::Semaphore;

/// One child of a [`Suite`].
pub enum Entry {
    /// A leaf unit; takes a semaphore slot while it runs.
    Unit(Arc<dyn Runnable>),
    /// A nested suite; its children share the parent's semaphore.
    Suite(Suite),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Unit(unit) => write!(f, "Unit({})", unit.id()),
            Entry::Suite(suite) => fmt::Debug::fmt(suite, f),
        }
    }
}

/// An ordered tree of units and nested suites.
#[derive(Default)]
pub struct Suite {
    name: Option<String>,
    entries: Vec<Entry>,
}

impl Suite {
    /// Creates an empty, anonymous suite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty suite with a name used in logs.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            entries: Vec::new(),
        }
    }

    /// The suite's name, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Appends a leaf unit.
    pub fn add_test<R: Runnable + 'static>(&mut self, unit: R) -> &mut Self {
        self.entries.push(Entry::Unit(Arc::new(unit)));
        self
    }

    /// Appends a nested suite.
    pub fn add_suite(&mut self, suite: Suite) -> &mut Self {
        self.entries.push(Entry::Suite(suite));
        self
    }

    /// Direct children in run order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the suite has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leaf units in the whole tree.
    #[must_use]
    pub fn count_test_cases(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Unit(_) => 1,
                Entry::Suite(suite) => suite.count_test_cases(),
            })
            .sum()
    }

    /// Runs every unit in the tree.
    ///
    /// All units are queued on `ctx`'s semaphore before this returns; with
    /// free slots the first ones run synchronously right away. The returned
    /// deferred resolves once every unit has finished reporting, or has been
    /// skipped because the result was stopped.
    pub fn run(&self, ctx: &RunContext) -> Deferred<()> {
        let mut finished = Vec::with_capacity(self.count_test_cases());
        self.enqueue(ctx, &mut finished);
        tracing::debug!(
            suite = self.name().unwrap_or("<root>"),
            queued = finished.len(),
            "suite queued"
        );
        join_all(finished).then(|_| -> Step<()> { Step::value(()) })
    }

    /// Queues every leaf, depth first, collecting their completion signals.
    fn enqueue(&self, ctx: &RunContext, finished: &mut Vec<Deferred<()>>) {
        for entry in &self.entries {
            match entry {
                Entry::Suite(suite) => suite.enqueue(ctx, finished),
                Entry::Unit(unit) => finished.push(schedule(Arc::clone(unit), ctx.clone())),
            }
        }
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Runs `unit` once it holds a slot, releasing the slot when it finishes.
fn schedule(unit: Arc<dyn Runnable>, ctx: RunContext) -> Deferred<()> {
    ctx.lock()
        .acquire()
        .then(move |acquired: Outcome<Semaphore>| -> Step<()> {
            let lock = match acquired {
                Ok(lock) => lock,
                Err(failure) => return Step::fail(failure),
            };

            let ran = if ctx.result().should_stop() {
                tracing::debug!(test = %unit.id(), "skipped after stop");
                Deferred::succeeded(())
            } else {
                isolate(|| Ok(unit.run(&ctx))).unwrap_or_else(|failure| {
                    tracing::error!(test = %unit.id(), %failure, "unit panicked outside its lifecycle");
                    ctx.result().add_error(unit.id(), &failure);
                    Deferred::succeeded(())
                })
            };

            ran.add_both(move |outcome: Outcome<()>| {
                lock.release();
                outcome
            });
            Step::wait(ran)
        })
}
