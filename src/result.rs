//! The shared sink recording per-test outcomes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::case::TestId;
use crate::error::Failure;

/// Observer of accumulator events, used by reporters.
///
/// Every method has a no-op default so a listener only implements what it
/// renders.
pub trait Listener: Send + Sync {
    /// A test is about to run.
    fn start_test(&self, _id: &TestId) {}
    /// A test passed.
    fn add_success(&self, _id: &TestId) {}
    /// A test failed an assertion.
    fn add_failure(&self, _id: &TestId, _failure: &Failure) {}
    /// A test raised an error.
    fn add_error(&self, _id: &TestId, _failure: &Failure) {}
    /// A test finished reporting.
    fn stop_test(&self, _id: &TestId) {}
}

/// Accumulates outcomes for one run.
///
/// Cloning yields another handle to the same accumulator. All mutation goes
/// through one lock, so units completing on timer threads are safe.
///
/// # Example
///
/// ```rust
/// use deferunit::case::TestId;
/// use deferunit::error::Failure;
/// use deferunit::result::TestResult;
///
/// let result = TestResult::new();
/// let id = TestId::new("Basic", "test_passes");
///
/// result.start_test(&id);
/// result.add_failure(&id, &Failure::assertion("1 != 2"));
///
/// assert_eq!(result.tests_run(), 1);
/// assert!(!result.was_successful());
/// ```
#[derive(Clone, Default)]
pub struct TestResult {
    inner: Arc<Mutex<ResultState>>,
    listener: Option<Arc<dyn Listener>>,
}

#[derive(Default)]
struct ResultState {
    tests_run: usize,
    successes: usize,
    failures: Vec<(TestId, String)>,
    errors: Vec<(TestId, String)>,
    should_stop: bool,
}

impl TestResult {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty accumulator that notifies `listener` on every event.
    #[must_use]
    pub fn with_listener(listener: Arc<dyn Listener>) -> Self {
        Self {
            inner: Arc::default(),
            listener: Some(listener),
        }
    }

    /// Counts a test as started.
    pub fn start_test(&self, id: &TestId) {
        self.inner.lock().tests_run += 1;
        tracing::debug!(test = %id, "test started");
        if let Some(listener) = &self.listener {
            listener.start_test(id);
        }
    }

    /// Marks the end of a test's reporting.
    pub fn stop_test(&self, id: &TestId) {
        if let Some(listener) = &self.listener {
            listener.stop_test(id);
        }
    }

    /// Records a pass.
    pub fn add_success(&self, id: &TestId) {
        self.inner.lock().successes += 1;
        tracing::debug!(test = %id, "test passed");
        if let Some(listener) = &self.listener {
            listener.add_success(id);
        }
    }

    /// Records an assertion failure.
    pub fn add_failure(&self, id: &TestId, failure: &Failure) {
        self.inner
            .lock()
            .failures
            .push((id.clone(), failure.describe()));
        tracing::debug!(test = %id, %failure, "test failed");
        if let Some(listener) = &self.listener {
            listener.add_failure(id, failure);
        }
    }

    /// Records an error.
    pub fn add_error(&self, id: &TestId, failure: &Failure) {
        self.inner
            .lock()
            .errors
            .push((id.clone(), failure.describe()));
        tracing::debug!(test = %id, %failure, "test errored");
        if let Some(listener) = &self.listener {
            listener.add_error(id, failure);
        }
    }

    /// Records `failure` as a failure or an error according to its kind.
    pub fn add_outcome(&self, id: &TestId, failure: &Failure) {
        if failure.is_assertion() {
            self.add_failure(id, failure);
        } else {
            self.add_error(id, failure);
        }
    }

    /// Asks the run to skip every unit that has not started yet.
    pub fn stop(&self) {
        self.inner.lock().should_stop = true;
        tracing::debug!("stop requested");
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.inner.lock().should_stop
    }

    /// Returns `true` if nothing failed or errored.
    #[must_use]
    pub fn was_successful(&self) -> bool {
        let state = self.inner.lock();
        state.failures.is_empty() && state.errors.is_empty()
    }

    /// Number of tests started.
    #[must_use]
    pub fn tests_run(&self) -> usize {
        self.inner.lock().tests_run
    }

    /// Number of tests that passed.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.inner.lock().successes
    }

    /// Recorded failures in report order.
    #[must_use]
    pub fn failures(&self) -> Vec<(TestId, String)> {
        self.inner.lock().failures.clone()
    }

    /// Recorded errors in report order.
    #[must_use]
    pub fn errors(&self) -> Vec<(TestId, String)> {
        self.inner.lock().errors.clone()
    }
}

impl std::fmt::Debug for TestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("TestResult")
            .field("tests_run", &state.tests_run)
            .field("successes", &state.successes)
            .field("failures", &state.failures.len())
            .field("errors", &state.errors.len())
            .field("should_stop", &state.should_stop)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_result_is_successful() {
        let result = TestResult::new();
        assert!(result.was_successful());
        assert_eq!(result.tests_run(), 0);
        assert!(!result.should_stop());
    }

    #[test]
    fn test_add_outcome_classifies() {
        let result = TestResult::new();
        let id = TestId::new("Case", "test_a");

        result.add_outcome(&id, &Failure::assertion("expected"));
        result.add_outcome(&id, &Failure::error("unexpected"));

        assert_eq!(result.failures(), vec![(id.clone(), "expected".to_string())]);
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, id);
        assert!(errors[0].1.starts_with("unexpected"));
        assert!(!result.was_successful());
    }

    #[test]
    fn test_clone_shares_state() {
        let result = TestResult::new();
        let other = result.clone();
        other.start_test(&TestId::new("Case", "test_a"));
        other.stop();
        assert_eq!(result.tests_run(), 1);
        assert!(result.should_stop());
    }

    #[test]
    fn test_listener_is_notified() {
        #[derive(Default)]
        struct Counting(AtomicUsize);

        impl Listener for Counting {
            fn add_success(&self, _id: &TestId) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counting = Arc::new(Counting::default());
        let result = TestResult::with_listener(Arc::clone(&counting) as Arc<dyn Listener>);
        result.add_success(&TestId::new("Case", "test_a"));
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
        assert_eq!(result.successes(), 1);
    }
}
