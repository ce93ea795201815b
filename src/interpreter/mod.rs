//! Tree-walking evaluator for SecLang
//!
//! Statements run in order against one `Environment`. Every evaluation
//! step carries the program-counter label: the join of the labels of all
//! enclosing branch conditions. It starts at `Unclassified`.

mod expressions;
mod flow;
mod statements;

use crate::ast::{Program, Stmt};
use crate::console::{Console, StdConsole};
use crate::environment::Environment;
use crate::error::Result;
use crate::security::SecurityLabel;
use crate::value::RuntimeValue;

/// The evaluator. It owns the console that `debug` and `input` talk to.
pub struct Interpreter<C: Console = StdConsole> {
    console: C,
}

impl Interpreter<StdConsole> {
    pub fn new() -> Self {
        Self::with_console(StdConsole)
    }
}

impl Default for Interpreter<StdConsole> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Console> Interpreter<C> {
    pub fn with_console(console: C) -> Self {
        Self { console }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Run every top-level statement and collect each result. The first
    /// failure aborts the whole program.
    #[tracing::instrument(skip_all, fields(statements = program.body.len()))]
    pub fn evaluate_program(
        &mut self,
        program: &Program,
        env: &mut Environment,
    ) -> Result<Vec<RuntimeValue>> {
        let mut results = Vec::with_capacity(program.body.len());

        for stmt in &program.body {
            results.push(self.evaluate(stmt, env)?);
        }

        Ok(results)
    }

    /// Evaluate one top-level statement
    pub fn evaluate(&mut self, stmt: &Stmt, env: &mut Environment) -> Result<RuntimeValue> {
        self.execute(stmt, env, SecurityLabel::Unclassified)
    }
}

/// The last result that is not `Null`
pub fn last_value(results: &[RuntimeValue]) -> Option<&RuntimeValue> {
    results.iter().rev().find(|value| !value.is_null())
}
