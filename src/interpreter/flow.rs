//! Implicit-flow enforcement
//!
//! Inside a branch taken on a condition of label `pc`, no assignment may
//! target a variable labeled below `pc`, and a nested control structure
//! may only branch on variables labeled at least `pc`.

use crate::ast::{Expr, Stmt};
use crate::console::Console;
use crate::environment::Environment;
use crate::error::{ErrorKind, Result, SecLangError};
use crate::security::SecurityLabel;
use crate::value::{RuntimeValue, Value};

use super::Interpreter;

impl<C: Console> Interpreter<C> {
    /// Run the statements of a taken branch under `pc`
    pub(super) fn execute_branch(
        &mut self,
        body: &[Stmt],
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        let mut last = RuntimeValue::null();

        for stmt in body {
            check_nested_condition(stmt, env, pc)?;
            last = self.execute(stmt, env, pc)?;
        }

        Ok(last)
    }

    /// Evaluate a branch condition; it must be a `bool`
    pub(super) fn eval_condition(
        &mut self,
        condition: &Expr,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<(bool, SecurityLabel)> {
        let value = self.eval_expr(condition, env, pc)?;
        match value.value {
            Value::Bool(b) => Ok((b, value.label)),
            ref other => Err(SecLangError::new(
                ErrorKind::NonBooleanCondition(other.type_name().to_string()),
                Some(condition.span()),
            )),
        }
    }

    /// An assignment under `pc` may not write below `pc`
    pub(super) fn check_implicit_flow(
        name: &str,
        target: SecurityLabel,
        pc: SecurityLabel,
    ) -> Result<()> {
        if pc.flows_to(target) {
            Ok(())
        } else {
            Err(SecLangError::new(ErrorKind::ImplicitFlow(name.to_string()), None))
        }
    }
}

/// A nested `if`/`while` must branch only on variables at or above `pc`.
/// Literals are ignored; they are always `Unclassified`.
fn check_nested_condition(stmt: &Stmt, env: &Environment, pc: SecurityLabel) -> Result<()> {
    let (condition, kind, span) = match stmt {
        Stmt::Conditional { condition, span, .. } => (condition, "conditional", *span),
        Stmt::While { condition, span, .. } => (condition, "while", *span),
        _ => return Ok(()),
    };

    let mut names = Vec::new();
    condition_identifiers(condition, &mut names);

    for name in names {
        let label = env.lookup(name).map_err(|e| e.or_at(span))?.label;
        if !pc.flows_to(label) {
            return Err(SecLangError::new(ErrorKind::NestedImplicitFlow(kind), Some(span)));
        }
    }
    Ok(())
}

/// Every identifier mentioned in a condition, left to right
fn condition_identifiers<'a>(expr: &'a Expr, names: &mut Vec<&'a str>) {
    match expr {
        Expr::Identifier { symbol, .. } => names.push(symbol),
        Expr::Binary { left, right, .. } => {
            condition_identifiers(left, names);
            condition_identifiers(right, names);
        }
        Expr::Assignment { target, value, .. } => {
            condition_identifiers(target, names);
            condition_identifiers(value, names);
        }
        Expr::NumericLiteral { .. }
        | Expr::BooleanLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::Read { .. } => {}
    }
}
