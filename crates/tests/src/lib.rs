//! Integration test harness for Weft.
//!
//! This crate provides utilities for end-to-end testing of the full
//! pipeline: build pattern, run interpreter, inspect channel output.

use std::rc::Rc;

use weft_engine::{
    EngineConfig, EngineError, Interpreter, RunOutput, SubroutineSet, TableDictionary,
};
use weft_pattern::Pattern;

/// Fixed seed used by harness tests that do not pick their own.
pub const TEST_SEED: i64 = 42;

/// Test harness for running patterns end to end.
pub struct TestHarness {
    interpreter: Interpreter,
}

impl TestHarness {
    /// Harness over a pattern with the default test seed.
    pub fn new(pattern: Pattern) -> Self {
        Self::seeded(pattern, TEST_SEED)
    }

    /// Harness over a pattern with an explicit seed.
    pub fn seeded(pattern: Pattern, seed: i64) -> Self {
        Self::with_config(pattern, EngineConfig::seeded(seed))
    }

    /// Harness with full configuration control.
    pub fn with_config(pattern: Pattern, config: EngineConfig) -> Self {
        Self {
            interpreter: Interpreter::new(pattern, config),
        }
    }

    pub fn dictionary(mut self, dictionary: TableDictionary) -> Self {
        self.interpreter = self.interpreter.with_dictionary(Rc::new(dictionary));
        self
    }

    pub fn subroutines(mut self, subroutines: SubroutineSet) -> Self {
        self.interpreter = self.interpreter.with_subroutines(subroutines);
        self
    }

    /// Run the pattern.
    ///
    /// # Panics
    ///
    /// Panics if the run fails.
    pub fn run(&mut self) -> RunOutput {
        match self.interpreter.run() {
            Ok(output) => output,
            Err(err) => panic!("run failed: {err}"),
        }
    }

    /// Run the pattern and return the `main` channel text.
    pub fn main(&mut self) -> String {
        self.run().main().to_string()
    }

    /// Run a pattern expected to fail and return the error.
    ///
    /// # Panics
    ///
    /// Panics if the run succeeds.
    pub fn run_err(&mut self) -> EngineError {
        match self.interpreter.run() {
            Ok(output) => panic!("run unexpectedly succeeded: {:?}", output.main()),
            Err(err) => err,
        }
    }
}
