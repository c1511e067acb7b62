//! The test-authoring surface.
//!
//! A test class is a type implementing [`TestCase`] (fixture creation, setup,
//! teardown) and [`TestMethods`] (its `test*` methods as a static list). The
//! list is usually generated by `#[deferunit::suite]` on an inherent impl
//! block; writing it by hand works the same way.
//!
//! A test method returns anything implementing [`IntoBody`]: nothing or a
//! `Result` for synchronous tests, or a [`Deferred`] for tests that finish
//! later.
//!
//! ```rust
//! use deferunit::case::{Body, TestCase, TestContext, TestMethod, TestMethods};
//! use deferunit::error::Failure;
//!
//! struct Counter {
//!     ready: bool,
//! }
//!
//! impl TestCase for Counter {
//!     fn create(_ctx: &TestContext) -> Self {
//!         Counter { ready: false }
//!     }
//!
//!     fn set_up(&mut self) -> Result<(), Failure> {
//!         self.ready = true;
//!         Ok(())
//!     }
//! }
//!
//! fn test_ready(case: &mut Counter) -> Result<Body, Failure> {
//!     deferunit::assertions::ensure(case.ready, "set_up did not run")?;
//!     Ok(Body::Done)
//! }
//!
//! impl TestMethods for Counter {
//!     fn test_methods() -> Vec<(&'static str, TestMethod<Self>)> {
//!         vec![("test_ready", test_ready as TestMethod<Self>)]
//!     }
//! }
//! ```

mod loader;

pub use loader::Loader;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Timer;
use crate::deferred::{self, Deferred};
use crate::error::Failure;

/// Identity of one test: the name its class was registered under plus the
/// method name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestId {
    case: Arc<str>,
    method: Arc<str>,
}

impl TestId {
    /// Creates an identity.
    #[must_use]
    pub fn new(case: impl Into<Arc<str>>, method: impl Into<Arc<str>>) -> Self {
        Self {
            case: case.into(),
            method: method.into(),
        }
    }

    /// The registered class name.
    #[must_use]
    pub fn case(&self) -> &str {
        &self.case
    }

    /// The method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.case, self.method)
    }
}

/// What a test body produced.
pub enum Body {
    /// The body finished synchronously.
    Done,
    /// The body finishes when this deferred settles.
    Async(Deferred<()>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Done => f.write_str("Done"),
            Body::Async(_) => f.write_str("Async(..)"),
        }
    }
}

/// Conversion of a test method's return value into a [`Body`].
pub trait IntoBody {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns the failure carried by the value, if any.
    fn into_body(self) -> Result<Body, Failure>;
}

impl IntoBody for () {
    fn into_body(self) -> Result<Body, Failure> {
        Ok(Body::Done)
    }
}

impl IntoBody for Body {
    fn into_body(self) -> Result<Body, Failure> {
        Ok(self)
    }
}

impl IntoBody for Deferred<()> {
    fn into_body(self) -> Result<Body, Failure> {
        Ok(Body::Async(self))
    }
}

impl<B: IntoBody> IntoBody for Result<B, Failure> {
    fn into_body(self) -> Result<Body, Failure> {
        self?.into_body()
    }
}

/// A test method of class `C`.
pub type TestMethod<C> = fn(&mut C) -> Result<Body, Failure>;

/// Per-test environment handed to fixture creation.
#[derive(Clone)]
pub struct TestContext {
    id: TestId,
    timer: Arc<dyn Timer>,
}

impl TestContext {
    /// Creates a context.
    #[must_use]
    pub fn new(id: TestId, timer: Arc<dyn Timer>) -> Self {
        Self { id, timer }
    }

    /// Identity of the test being run.
    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    /// The run's timer.
    #[must_use]
    pub fn timer(&self) -> Arc<dyn Timer> {
        Arc::clone(&self.timer)
    }

    /// A deferred resolving with `value` after `delay` on the run's timer.
    #[must_use]
    pub fn later<T: Send + 'static>(&self, delay: Duration, value: T) -> Deferred<T> {
        deferred::later(self.timer.as_ref(), delay, value)
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// A test class: fixture construction plus setup and teardown hooks.
///
/// A fresh instance is created for every test method.
pub trait TestCase: Send + Sized + 'static {
    /// Builds the fixture for one test.
    fn create(ctx: &TestContext) -> Self;

    /// Runs before the test body. A failure here is reported as an error
    /// and skips both the body and teardown.
    ///
    /// # Errors
    ///
    /// Any failure aborts the test.
    fn set_up(&mut self) -> Result<(), Failure> {
        Ok(())
    }

    /// Runs after the test body, whatever its outcome.
    ///
    /// # Errors
    ///
    /// A failure is reported as an additional error.
    fn tear_down(&mut self) -> Result<(), Failure> {
        Ok(())
    }
}

/// The static list of a class's methods.
pub trait TestMethods: TestCase {
    /// Every candidate method with its name. The loader filters and sorts.
    fn test_methods() -> Vec<(&'static str, TestMethod<Self>)>;
}
