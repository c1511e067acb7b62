//! Example: a suite with failures and errors
//!
//! Shows how each kind of outcome is reported and that the process exits
//! non-zero when anything fails.
//!
//! ```text
//! cargo run --example failing_cases
//! DEFERUNIT_VERBOSITY=2 cargo run --example failing_cases
//! ```

use std::process::ExitCode;

use deferunit::assertions::{ensure_panics, matcher::contains_str};
use deferunit::prelude::*;
use deferunit::{ensure, ensure_eq, ensure_that};

struct Inventory {
    items: Vec<&'static str>,
}

impl TestCase for Inventory {
    fn create(_ctx: &TestContext) -> Self {
        Inventory { items: Vec::new() }
    }

    fn set_up(&mut self) -> Result<(), Failure> {
        self.items = vec!["bolt", "nut", "washer"];
        Ok(())
    }

    fn tear_down(&mut self) -> Result<(), Failure> {
        self.items.clear();
        Ok(())
    }
}

#[deferunit::suite]
impl Inventory {
    fn test_count(&self) -> Result<(), Failure> {
        ensure_eq!(self.items.len(), 3);
        Ok(())
    }

    fn test_contains_bolt(&self) -> Result<(), Failure> {
        ensure!(self.items.contains(&"bolt"), "bolt missing from {:?}", self.items);
        Ok(())
    }

    fn test_wrong_total(&self) -> Result<(), Failure> {
        // Fails: reported under FAIL with expected and actual values.
        ensure_eq!(self.items.len(), 4);
        Ok(())
    }

    fn test_index_out_of_range(&mut self) {
        // Panics: reported under ERROR.
        let _ = self.items[10];
    }

    fn test_panics_are_checkable(&mut self) -> Result<(), Failure> {
        let payload = ensure_panics(|| panic!("shelf collapsed"))?;
        let message = payload.downcast_ref::<&str>().copied().unwrap_or_default();
        ensure_that!(*message, contains_str("collapsed"));
        Ok(())
    }
}

struct BrokenFixture;

impl TestCase for BrokenFixture {
    fn create(_ctx: &TestContext) -> Self {
        BrokenFixture
    }

    fn set_up(&mut self) -> Result<(), Failure> {
        // Every test of this class is an error; bodies and teardown never run.
        Err(Failure::error("database unavailable"))
    }
}

#[deferunit::suite]
impl BrokenFixture {
    fn test_query(&self) {}
}

fn main() -> ExitCode {
    let loader = Loader::new()
        .case::<Inventory>("Inventory")
        .case::<BrokenFixture>("BrokenFixture");
    deferunit::run(loader).exit_code()
}
