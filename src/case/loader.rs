//! Builds suites from registered test classes.

use crate::case::{TestId, TestMethod, TestMethods};
use crate::error::{Error, Result};
use crate::executor::{CaseUnit, Suite};

/// Method name used when a class has no prefixed methods.
const FALLBACK_METHOD: &str = "run_test";

/// Collects test classes into a runnable [`Suite`].
///
/// Every class is registered under an explicit name, which becomes the class
/// part of each [`TestId`].
///
/// # Example
///
/// ```rust
/// use deferunit::case::{Loader, TestCase, TestContext, TestMethod, TestMethods};
///
/// struct Empty;
///
/// impl TestCase for Empty {
///     fn create(_ctx: &TestContext) -> Self {
///         Empty
///     }
/// }
///
/// impl TestMethods for Empty {
///     fn test_methods() -> Vec<(&'static str, TestMethod<Self>)> {
///         Vec::new()
///     }
/// }
///
/// let suite = Loader::new().case::<Empty>("Empty").suite();
/// assert_eq!(suite.count_test_cases(), 0);
/// ```
#[derive(Debug)]
pub struct Loader {
    prefix: String,
    suites: Vec<Suite>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Creates a loader discovering methods named `test*`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix("test")
    }

    /// Creates a loader discovering methods starting with `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suites: Vec::new(),
        }
    }

    /// Names of the methods of `C` that would run, in execution order.
    #[must_use]
    pub fn test_case_names<C: TestMethods>(&self) -> Vec<&'static str> {
        let methods = C::test_methods();
        let mut names: Vec<&'static str> = methods
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| name.starts_with(&self.prefix))
            .collect();
        names.sort_unstable();
        names.dedup();

        if names.is_empty() && methods.iter().any(|(name, _)| *name == FALLBACK_METHOD) {
            names.push(FALLBACK_METHOD);
        }
        names
    }

    /// Builds a suite with one unit per discovered method of `C`.
    #[must_use]
    pub fn load_case<C: TestMethods>(&self, name: &str) -> Suite {
        let methods = C::test_methods();
        let mut suite = Suite::named(name);
        for method_name in self.test_case_names::<C>() {
            if let Some(method) = lookup(&methods, method_name) {
                suite.add_test(CaseUnit::new(TestId::new(name, method_name), method));
            }
        }
        tracing::debug!(case = name, tests = suite.count_test_cases(), "case loaded");
        suite
    }

    /// Registers `C` under `name`.
    #[must_use]
    pub fn case<C: TestMethods>(mut self, name: &str) -> Self {
        let suite = self.load_case::<C>(name);
        self.suites.push(suite);
        self
    }

    /// Builds a single unit for `method` of `C`, whatever its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchTestMethod`] if `C` has no such method.
    pub fn try_unit<C: TestMethods>(&self, name: &str, method: &str) -> Result<CaseUnit<C>> {
        let methods = C::test_methods();
        lookup(&methods, method)
            .map(|found| CaseUnit::new(TestId::new(name, method), found))
            .ok_or_else(|| Error::no_such_test_method(name, method))
    }

    /// Returns a suite holding one nested suite per registered class, in
    /// registration order.
    #[must_use]
    pub fn suite(self) -> Suite {
        let mut suite = Suite::new();
        for case in self.suites {
            suite.add_suite(case);
        }
        suite
    }
}

fn lookup<C>(methods: &[(&'static str, TestMethod<C>)], name: &str) -> Option<TestMethod<C>> {
    methods
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, method)| *method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Body, TestCase, TestContext};
    use crate::error::Failure;

    struct Sample;

    impl TestCase for Sample {
        fn create(_ctx: &TestContext) -> Self {
            Sample
        }
    }

    fn pass(_: &mut Sample) -> std::result::Result<Body, Failure> {
        Ok(Body::Done)
    }

    impl TestMethods for Sample {
        fn test_methods() -> Vec<(&'static str, TestMethod<Self>)> {
            let pass: TestMethod<Self> = pass;
            vec![
                ("test_zeta", pass),
                ("helper", pass),
                ("test_alpha", pass),
                ("run_test", pass),
                ("test_mid", pass),
            ]
        }
    }

    struct Fallback;

    impl TestCase for Fallback {
        fn create(_ctx: &TestContext) -> Self {
            Fallback
        }
    }

    impl TestMethods for Fallback {
        fn test_methods() -> Vec<(&'static str, TestMethod<Self>)> {
            fn run(_: &mut Fallback) -> std::result::Result<Body, Failure> {
                Ok(Body::Done)
            }
            vec![("run_test", run as TestMethod<Self>)]
        }
    }

    #[test]
    fn test_names_filtered_and_sorted() {
        let loader = Loader::new();
        assert_eq!(
            loader.test_case_names::<Sample>(),
            vec!["test_alpha", "test_mid", "test_zeta"]
        );
    }

    #[test]
    fn test_custom_prefix() {
        let loader = Loader::with_prefix("help");
        assert_eq!(loader.test_case_names::<Sample>(), vec!["helper"]);
    }

    #[test]
    fn test_run_test_fallback() {
        assert_eq!(Loader::new().test_case_names::<Fallback>(), vec!["run_test"]);
    }

    #[test]
    fn test_load_case_counts_units() {
        let suite = Loader::new().load_case::<Sample>("Sample");
        assert_eq!(suite.count_test_cases(), 3);
        assert_eq!(suite.name(), Some("Sample"));
    }

    #[test]
    fn test_suite_nests_per_class() {
        let suite = Loader::new()
            .case::<Sample>("Sample")
            .case::<Fallback>("Fallback")
            .suite();
        assert_eq!(suite.len(), 2);
        assert_eq!(suite.count_test_cases(), 4);
    }

    #[test]
    fn test_try_unit_unknown_method() {
        let err = Loader::new()
            .try_unit::<Sample>("Sample", "test_missing")
            .unwrap_err();
        assert_eq!(err, Error::no_such_test_method("Sample", "test_missing"));

        let unit = Loader::new().try_unit::<Sample>("Sample", "helper").unwrap();
        assert_eq!(unit.id().to_string(), "Sample.helper");
    }
}
