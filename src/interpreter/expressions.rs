//! Expression evaluation

use crate::ast::{BinaryOp, Expr, ReadTarget};
use crate::console::Console;
use crate::environment::Environment;
use crate::error::{ErrorKind, Result, SecLangError};
use crate::security::SecurityLabel;
use crate::token::Span;
use crate::value::{RuntimeValue, Value};

use super::Interpreter;

impl<C: Console> Interpreter<C> {
    pub(super) fn eval_expr(
        &mut self,
        expr: &Expr,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        match expr {
            Expr::Identifier { symbol, span } => env.lookup(symbol).map_err(|e| e.or_at(*span)),

            Expr::NumericLiteral { value, .. } => Ok(RuntimeValue::public(Value::Int(*value))),
            Expr::BooleanLiteral { value, .. } => Ok(RuntimeValue::public(Value::Bool(*value))),
            Expr::StringLiteral { value, .. } => Ok(RuntimeValue::public(Value::String(value.clone()))),

            Expr::Binary { left, op, right, span } => {
                let left = self.eval_expr(left, env, pc)?;
                let right = self.eval_expr(right, env, pc)?;
                binary(*op, &left, &right, *span)
            }

            Expr::Assignment { target, value, span } => {
                self.eval_assignment(target, value, env, pc).map_err(|e| e.or_at(*span))
            }

            Expr::Read { channel, target, span } => {
                self.eval_read(channel, target.as_ref(), env).map_err(|e| e.or_at(*span))
            }
        }
    }

    fn eval_assignment(
        &mut self,
        target: &Expr,
        value: &Expr,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        let Expr::Identifier { symbol, .. } = target else {
            return Err(SecLangError::new(ErrorKind::InvalidAssignmentTarget, None));
        };

        let current = env.lookup(symbol)?;
        Self::check_implicit_flow(symbol, current.label, pc)?;

        let mut new_value = self.eval_expr(value, env, pc)?;
        if matches!(value, Expr::Read { target: Some(_), .. }) {
            // Data read into a variable takes the variable's label
            new_value = new_value.relabel(current.label);
        }

        env.assign(symbol, new_value)
    }

    fn eval_read(
        &mut self,
        channel: &str,
        target: Option<&ReadTarget>,
        env: &mut Environment,
    ) -> Result<RuntimeValue> {
        let class = env.channel_label(channel)?;
        let target_label = match target {
            Some(ReadTarget::Declaration { label, .. }) => *label,
            Some(ReadTarget::Assignment { identifier }) => env.lookup(identifier)?.label,
            None => SecurityLabel::Unclassified,
        };

        if !class.flows_to(target_label) {
            return Err(SecLangError::new(
                ErrorKind::ChannelReadBreach(channel.to_string()),
                None,
            ));
        }

        let line = env.read_channel(channel)?;
        Ok(RuntimeValue::public(Value::from_channel_line(&line)))
    }
}

/// Apply a binary operator. The result carries the join of both labels.
fn binary(
    op: BinaryOp,
    left: &RuntimeValue,
    right: &RuntimeValue,
    span: Span,
) -> Result<RuntimeValue> {
    let label = left.label.join(right.label);

    let value = match (&left.value, &right.value) {
        (Value::String(_), _) | (_, Value::String(_)) => string_op(op, &left.value, &right.value),
        (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b),
        (Value::Bool(a), Value::Bool(b)) if op == BinaryOp::Eq => Ok(Value::Bool(a == b)),
        _ => Err(invalid_operands(op, &left.value, &right.value)),
    };

    value
        .map(|value| RuntimeValue::new(value, label))
        .map_err(|kind| SecLangError::new(kind, Some(span)))
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> std::result::Result<Value, ErrorKind> {
    let overflow = || ErrorKind::IntegerOverflow;

    Ok(match op {
        BinaryOp::Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
        BinaryOp::Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
        BinaryOp::Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
        BinaryOp::Div => {
            if b == 0 {
                return Err(ErrorKind::DivisionByZero);
            }
            Value::Int(a.checked_div(b).ok_or_else(overflow)?)
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(ErrorKind::DivisionByZero);
            }
            Value::Int(a.checked_rem(b).ok_or_else(overflow)?)
        }
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Ne => Value::Bool(a != b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
    })
}

/// Longest string `+` or `*` may build
const MAX_STRING_BYTES: usize = 1 << 30;

fn string_op(op: BinaryOp, left: &Value, right: &Value) -> std::result::Result<Value, ErrorKind> {
    match (op, left, right) {
        (BinaryOp::Add, _, _) => {
            let (left, right) = (left.to_string(), right.to_string());
            if left.len().saturating_add(right.len()) > MAX_STRING_BYTES {
                return Err(ErrorKind::StringTooLong { limit: MAX_STRING_BYTES });
            }
            Ok(Value::String(left + &right))
        }

        (BinaryOp::Eq, Value::String(a), Value::String(b)) => Ok(Value::Bool(a == b)),
        (BinaryOp::Eq, _, _) => Ok(Value::Bool(false)),

        (BinaryOp::Mul, Value::String(s), Value::Int(n)) if *n >= 0 => {
            let count = usize::try_from(*n).map_err(|_| ErrorKind::IntegerOverflow)?;
            let total = s.len().checked_mul(count).ok_or(ErrorKind::IntegerOverflow)?;
            if total > MAX_STRING_BYTES {
                return Err(ErrorKind::StringTooLong { limit: MAX_STRING_BYTES });
            }
            Ok(Value::String(s.repeat(count)))
        }

        (BinaryOp::Div, Value::String(s), Value::Int(n)) if *n > 0 => {
            let chars = s.chars().count();
            let keep = usize::try_from(*n).map_or(0, |n| chars / n);
            Ok(Value::String(s.chars().take(keep).collect()))
        }

        _ => Err(invalid_operands(op, left, right)),
    }
}

fn invalid_operands(op: BinaryOp, left: &Value, right: &Value) -> ErrorKind {
    ErrorKind::InvalidOperands {
        op,
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}
