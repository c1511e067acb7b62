//! Example: tests that finish later
//!
//! Test methods return `Deferred<()>`. The runner waits for each one, up to
//! the watchdog, while other units queue behind the semaphore.
//!
//! ```text
//! cargo run --example async_cases
//! DEFERUNIT_CONCURRENCY=4 DEFERUNIT_WATCHDOG_MS=300 cargo run --example async_cases
//! ```

use std::process::ExitCode;
use std::time::Duration;

use deferunit::assertions::matcher::{all_of_boxed, gt, lt, Matcher};
use deferunit::prelude::*;
use deferunit::{ensure_eq, ensure_that};

/// A fake service whose replies arrive after a delay.
#[derive(Clone)]
struct Service {
    ctx: TestContext,
}

impl Service {
    fn fetch(&self, key: &str) -> Deferred<u32> {
        let value = u32::try_from(key.len()).unwrap_or(u32::MAX);
        self.ctx.later(Duration::from_millis(30), value)
    }
}

struct Requests {
    service: Service,
}

impl TestCase for Requests {
    fn create(ctx: &TestContext) -> Self {
        Requests {
            service: Service { ctx: ctx.clone() },
        }
    }
}

#[deferunit::suite]
impl Requests {
    fn test_single_reply(&self) -> Deferred<()> {
        self.service.fetch("hello").then(|reply: Outcome<u32>| -> Result<(), Failure> {
            ensure_eq!(reply?, 5);
            Ok(())
        })
    }

    fn test_sequential_replies(&self) -> Deferred<()> {
        // The second request starts only once the first reply is in.
        let service = self.service.clone();
        self.service
            .fetch("first")
            .then(move |first: Outcome<u32>| match first {
                Ok(_) => Step::wait(service.fetch("again")),
                Err(failure) => Step::fail(failure),
            })
            .then(|second: Outcome<u32>| -> Result<(), Failure> {
                let bounds: Vec<Box<dyn Matcher<u32>>> = vec![Box::new(gt(0)), Box::new(lt(10))];
                ensure_that!(second?, all_of_boxed(bounds));
                Ok(())
            })
    }

    fn test_reply_rejected(&self) -> Deferred<()> {
        // Fails: a continuation turns the reply into an assertion failure.
        self.service.fetch("x").then(|reply: Outcome<u32>| -> Result<(), Failure> {
            ensure_eq!(reply?, 2);
            Ok(())
        })
    }

    fn test_never_replies(&self) -> Deferred<()> {
        // Errors: nothing resolves this, so the watchdog reports a timeout.
        Deferred::new()
    }
}

fn main() -> ExitCode {
    let config = RunnerConfig::from_env().verbosity(Verbosity::Verbose);
    let suite = Loader::new().case::<Requests>("Requests").suite();

    let summary = Runner::new(config).run(&suite);
    summary.exit_code()
}
