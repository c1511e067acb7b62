//! Running a whole suite and reporting on the console.
//!
//! # Example
//!
//! ```rust
//! use deferunit::case::Loader;
//! use deferunit::runner::{Runner, RunnerConfig};
//! use deferunit::report::Verbosity;
//!
//! let config = RunnerConfig::new().verbosity(Verbosity::Quiet);
//! let summary = Runner::new(config)
//!     .with_output(Box::new(std::io::sink()))
//!     .run(&Loader::new().suite());
//!
//! assert_eq!(summary.tests_run, 0);
//! assert!(summary.was_successful());
//! ```

use std::future::IntoFuture;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::case::Loader;
use crate::clock::{SystemTimer, Timer};
use crate::executor::{RunContext, Suite, DEFAULT_WATCHDOG};
use crate::report::{TextReporter, Verbosity};
use crate::result::{Listener, TestResult};
use crate::sync::Semaphore;

/// Environment variable overriding [`RunnerConfig::concurrency`].
pub const ENV_CONCURRENCY: &str = "DEFERUNIT_CONCURRENCY";
/// Environment variable overriding [`RunnerConfig::watchdog`], in milliseconds.
pub const ENV_WATCHDOG_MS: &str = "DEFERUNIT_WATCHDOG_MS";
/// Environment variable overriding [`RunnerConfig::verbosity`] (`0`, `1` or `2`).
pub const ENV_VERBOSITY: &str = "DEFERUNIT_VERBOSITY";

/// Configuration for a [`Runner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Units allowed to run at once. At least 1.
    pub concurrency: usize,
    /// Time an asynchronous body may take.
    pub watchdog: Duration,
    /// Progress output style.
    pub verbosity: Verbosity,
    /// Name tests `Case.method` rather than by method alone.
    pub descriptions: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            watchdog: DEFAULT_WATCHDOG,
            verbosity: Verbosity::default(),
            descriptions: true,
        }
    }
}

impl RunnerConfig {
    /// Create a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by the `DEFERUNIT_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `DEFERUNIT_*` keys.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.concurrency = n,
                _ => tracing::warn!(key = ENV_CONCURRENCY, value = %raw, "ignoring invalid setting"),
            }
        }
        if let Some(raw) = lookup(ENV_WATCHDOG_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.watchdog = Duration::from_millis(ms),
                Err(_) => tracing::warn!(key = ENV_WATCHDOG_MS, value = %raw, "ignoring invalid setting"),
            }
        }
        if let Some(raw) = lookup(ENV_VERBOSITY) {
            match raw.trim().parse::<u8>().ok().and_then(Verbosity::from_level) {
                Some(verbosity) => config.verbosity = verbosity,
                None => tracing::warn!(key = ENV_VERBOSITY, value = %raw, "ignoring invalid setting"),
            }
        }
        config
    }

    /// Set how many units may run at once. Zero is treated as one.
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the watchdog interval.
    #[must_use]
    pub fn watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Set the progress output style.
    #[must_use]
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Choose between `Case.method` and bare method names.
    #[must_use]
    pub fn descriptions(mut self, descriptions: bool) -> Self {
        self.descriptions = descriptions;
        self
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Tests started.
    pub tests_run: usize,
    /// Recorded failures.
    pub failures: usize,
    /// Recorded errors.
    pub errors: usize,
    /// Wall time from start to the last report.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Returns `true` if nothing failed or errored.
    #[must_use]
    pub fn was_successful(&self) -> bool {
        self.failures == 0 && self.errors == 0
    }

    /// Process exit status: success only if the run was successful.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.was_successful() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Runs a suite to completion and prints a text report.
///
/// [`run`](Runner::run) blocks the calling thread until every unit has
/// reported. With a [`MockClock`](crate::clock::MockClock) timer, something
/// else must advance the clock for asynchronous tests to finish.
pub struct Runner {
    config: RunnerConfig,
    timer: Arc<dyn Timer>,
    output: Option<Box<dyn Write + Send>>,
}

impl Runner {
    /// Creates a runner on real time, printing to stdout.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            timer: Arc::new(SystemTimer::new()),
            output: None,
        }
    }

    /// Uses `timer` for the watchdog and for [`TestContext::later`](crate::case::TestContext::later).
    #[must_use]
    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    /// Writes the report to `output` instead of stdout.
    #[must_use]
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = Some(output);
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs every unit of `suite`, prints the report and returns the totals.
    pub fn run(self, suite: &Suite) -> RunSummary {
        let output = self.output.unwrap_or_else(|| Box::new(std::io::stdout()));
        let reporter = Arc::new(TextReporter::new(
            output,
            self.config.verbosity,
            self.config.descriptions,
        ));
        let result = TestResult::with_listener(Arc::clone(&reporter) as Arc<dyn Listener>);
        let ctx = RunContext::new(
            result.clone(),
            Semaphore::new(self.config.concurrency.max(1)),
            self.timer,
        )
        .with_watchdog(self.config.watchdog);

        tracing::info!(
            tests = suite.count_test_cases(),
            concurrency = self.config.concurrency,
            watchdog = ?self.config.watchdog,
            "run started"
        );
        let started = Instant::now();
        let finished = suite.run(&ctx);
        if let Err(failure) = futures::executor::block_on(finished.into_future()) {
            tracing::error!(%failure, "suite completion failed");
        }
        result.stop();

        let summary = RunSummary {
            tests_run: result.tests_run(),
            failures: result.failures().len(),
            errors: result.errors().len(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            tests = summary.tests_run,
            failures = summary.failures,
            errors = summary.errors,
            "run finished"
        );
        reporter.print_errors(&result);
        reporter.print_summary(&summary);
        summary
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Runs every class registered on `loader` with configuration from the
/// environment, printing to stdout.
///
/// ```rust,no_run
/// use deferunit::case::Loader;
///
/// fn main() -> std::process::ExitCode {
///     deferunit::run(Loader::new()).exit_code()
/// }
/// ```
pub fn run(loader: Loader) -> RunSummary {
    Runner::new(RunnerConfig::from_env()).run(&loader.suite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.watchdog, Duration::from_secs(5));
        assert_eq!(config.verbosity, Verbosity::Dots);
        assert!(config.descriptions);
    }

    #[test]
    fn test_config_builder() {
        let config = RunnerConfig::new()
            .concurrency(0)
            .watchdog(Duration::from_millis(50))
            .verbosity(Verbosity::Verbose)
            .descriptions(false);

        assert_eq!(config.concurrency, 1);
        assert_eq!(config.watchdog, Duration::from_millis(50));
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert!(!config.descriptions);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_CONCURRENCY, "4"),
            (ENV_WATCHDOG_MS, "250"),
            (ENV_VERBOSITY, "2"),
        ]
        .into_iter()
        .collect();
        let config = RunnerConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.concurrency, 4);
        assert_eq!(config.watchdog, Duration::from_millis(250));
        assert_eq!(config.verbosity, Verbosity::Verbose);
    }

    #[test]
    fn test_config_ignores_invalid_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_CONCURRENCY, "0"),
            (ENV_WATCHDOG_MS, "soon"),
            (ENV_VERBOSITY, "9"),
        ]
        .into_iter()
        .collect();
        let config = RunnerConfig::from_lookup(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.concurrency, 1);
        assert_eq!(config.watchdog, DEFAULT_WATCHDOG);
        assert_eq!(config.verbosity, Verbosity::Dots);
    }

    #[test]
    fn test_exit_code() {
        let mut summary = RunSummary {
            tests_run: 2,
            failures: 0,
            errors: 0,
            elapsed: Duration::ZERO,
        };
        assert!(summary.was_successful());
        assert_eq!(format!("{:?}", summary.exit_code()), format!("{:?}", ExitCode::SUCCESS));

        summary.errors = 1;
        assert!(!summary.was_successful());
        assert_eq!(format!("{:?}", summary.exit_code()), format!("{:?}", ExitCode::FAILURE));
    }
}
