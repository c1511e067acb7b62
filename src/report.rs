//! Console reporting.

use std::fmt;
use std::io::Write;

use parking_lot::Mutex;

use crate::case::TestId;
use crate::error::Failure;
use crate::result::{Listener, TestResult};
use crate::runner::RunSummary;

const SEPARATOR_HEAVY: &str =
    "======================================================================";
const SEPARATOR_LIGHT: &str =
    "----------------------------------------------------------------------";

/// How much the reporter prints while tests run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Nothing until the final summary.
    Quiet,
    /// One character per outcome: `.`, `F` or `E`.
    #[default]
    Dots,
    /// One line per test: `Case.method ... ok`.
    Verbose,
}

impl Verbosity {
    /// Maps the numeric levels `0`, `1` and `2`.
    #[must_use]
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Quiet),
            1 => Some(Self::Dots),
            2 => Some(Self::Verbose),
            _ => None,
        }
    }
}

/// A [`Listener`] that renders progress and the final report as text.
pub struct TextReporter {
    out: Mutex<Box<dyn Write + Send>>,
    verbosity: Verbosity,
    descriptions: bool,
}

impl TextReporter {
    /// Creates a reporter writing to `out`.
    ///
    /// With `descriptions` set, tests are named `Case.method`; otherwise by
    /// method name alone.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>, verbosity: Verbosity, descriptions: bool) -> Self {
        Self {
            out: Mutex::new(out),
            verbosity,
            descriptions,
        }
    }

    fn description(&self, id: &TestId) -> String {
        if self.descriptions {
            id.to_string()
        } else {
            id.method().to_string()
        }
    }

    fn emit(&self, args: fmt::Arguments<'_>) {
        let mut out = self.out.lock();
        if let Err(err) = out.write_fmt(args).and_then(|()| out.flush()) {
            tracing::warn!(error = %err, "failed to write test report");
        }
    }

    fn progress(&self, dot: &str, word: &str) {
        match self.verbosity {
            Verbosity::Quiet => {}
            Verbosity::Dots => self.emit(format_args!("{dot}")),
            Verbosity::Verbose => self.emit(format_args!("{word}\n")),
        }
    }

    /// Prints every recorded error, then every failure.
    pub fn print_errors(&self, result: &TestResult) {
        if self.verbosity != Verbosity::Quiet {
            self.emit(format_args!("\n"));
        }
        self.print_error_list("ERROR", &result.errors());
        self.print_error_list("FAIL", &result.failures());
    }

    fn print_error_list(&self, flavor: &str, entries: &[(TestId, String)]) {
        for (id, message) in entries {
            self.emit(format_args!(
                "{SEPARATOR_HEAVY}\n{flavor}: {}\n{SEPARATOR_LIGHT}\n{message}\n\n",
                self.description(id)
            ));
        }
    }

    /// Prints the closing totals.
    pub fn print_summary(&self, summary: &RunSummary) {
        let run = summary.tests_run;
        self.emit(format_args!(
            "{SEPARATOR_LIGHT}\nRan {run} test{} in {}ms\n\n",
            if run == 1 { "" } else { "s" },
            summary.elapsed.as_millis()
        ));

        if summary.was_successful() {
            self.emit(format_args!("OK\n"));
            return;
        }
        let mut counts = Vec::with_capacity(2);
        if summary.failures > 0 {
            counts.push(format!("failures={}", summary.failures));
        }
        if summary.errors > 0 {
            counts.push(format!("errors={}", summary.errors));
        }
        self.emit(format_args!("FAILED ({})\n", counts.join(", ")));
    }
}

impl Listener for TextReporter {
    fn start_test(&self, id: &TestId) {
        if self.verbosity == Verbosity::Verbose {
            self.emit(format_args!("{} ... ", self.description(id)));
        }
    }

    fn add_success(&self, _id: &TestId) {
        self.progress(".", "ok");
    }

    fn add_failure(&self, _id: &TestId, _failure: &Failure) {
        self.progress("F", "FAIL");
    }

    fn add_error(&self, _id: &TestId, _failure: &Failure) {
        self.progress("E", "ERROR");
    }
}

impl fmt::Debug for TextReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextReporter")
            .field("verbosity", &self.verbosity)
            .field("descriptions", &self.descriptions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn capturing(verbosity: Verbosity) -> (Capture, Arc<TextReporter>, TestResult) {
        let capture = Capture::default();
        let reporter = Arc::new(TextReporter::new(Box::new(capture.clone()), verbosity, true));
        let result = TestResult::with_listener(Arc::clone(&reporter) as Arc<dyn Listener>);
        (capture, reporter, result)
    }

    fn record_mixed(result: &TestResult) {
        let ok = TestId::new("Case", "test_ok");
        let bad = TestId::new("Case", "test_bad");
        let broken = TestId::new("Case", "test_broken");
        for id in [&ok, &bad, &broken] {
            result.start_test(id);
        }
        result.add_success(&ok);
        result.add_failure(&bad, &Failure::assertion("1 != 2"));
        result.add_error(&broken, &Failure::NonError { rendered: "42".into() });
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Verbosity::from_level(0), Some(Verbosity::Quiet));
        assert_eq!(Verbosity::from_level(2), Some(Verbosity::Verbose));
        assert_eq!(Verbosity::from_level(3), None);
        assert_eq!(Verbosity::default(), Verbosity::Dots);
    }

    #[test]
    fn test_dots() {
        let (capture, _reporter, result) = capturing(Verbosity::Dots);
        record_mixed(&result);
        assert_eq!(capture.text(), ".FE");
    }

    #[test]
    fn test_verbose_lines() {
        let (capture, _reporter, result) = capturing(Verbosity::Verbose);
        let id = TestId::new("Case", "test_ok");
        result.start_test(&id);
        result.add_success(&id);
        assert_eq!(capture.text(), "Case.test_ok ... ok\n");
    }

    #[test]
    fn test_print_errors_lists_errors_first() {
        let (capture, reporter, result) = capturing(Verbosity::Quiet);
        record_mixed(&result);
        reporter.print_errors(&result);

        let text = capture.text();
        let error_at = text.find("ERROR: Case.test_broken").unwrap();
        let fail_at = text.find("FAIL: Case.test_bad").unwrap();
        assert!(error_at < fail_at);
        assert!(text.contains("non-error value raised: 42"));
        assert!(text.contains("1 != 2"));
    }

    #[test]
    fn test_summary_lines() {
        let (capture, reporter, _result) = capturing(Verbosity::Quiet);
        reporter.print_summary(&RunSummary {
            tests_run: 3,
            failures: 1,
            errors: 2,
            elapsed: Duration::from_millis(12),
        });
        let text = capture.text();
        assert!(text.contains("Ran 3 tests in 12ms"));
        assert!(text.ends_with("FAILED (failures=1, errors=2)\n"));

        let (capture, reporter, _result) = capturing(Verbosity::Quiet);
        reporter.print_summary(&RunSummary {
            tests_run: 1,
            failures: 0,
            errors: 0,
            elapsed: Duration::ZERO,
        });
        assert!(capture.text().contains("Ran 1 test in 0ms"));
        assert!(capture.text().ends_with("OK\n"));
    }

    #[test]
    fn test_short_descriptions() {
        let capture = Capture::default();
        let reporter = TextReporter::new(Box::new(capture.clone()), Verbosity::Verbose, false);
        reporter.start_test(&TestId::new("Case", "test_short"));
        assert_eq!(capture.text(), "test_short ... ");
    }
}
