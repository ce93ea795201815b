//! Statement evaluation

use crate::ast::{AccessMode, Expr, Stmt, VarType};
use crate::console::Console;
use crate::environment::Environment;
use crate::error::{ErrorKind, Result, SecLangError};
use crate::security::SecurityLabel;
use crate::value::{RuntimeValue, Value};

use super::Interpreter;

impl<C: Console> Interpreter<C> {
    /// Execute one statement under the program-counter label `pc`
    pub(super) fn execute(
        &mut self,
        stmt: &Stmt,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        self.execute_stmt(stmt, env, pc).map_err(|e| e.or_at(stmt.span()))
    }

    fn execute_stmt(
        &mut self,
        stmt: &Stmt,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        match stmt {
            Stmt::Expr { expr } => self.eval_expr(expr, env, pc),

            Stmt::VarDeclaration {
                constant,
                identifier,
                declared_type,
                declared_label,
                value,
                ..
            } => {
                let declaration = Declaration {
                    identifier,
                    declared_type: *declared_type,
                    declared_label: *declared_label,
                    constant: *constant,
                    initializer: value.as_ref(),
                };
                self.declare(declaration, env, pc)
            }

            Stmt::Conditional { condition, body, else_body, .. } => {
                let (taken, label) = self.eval_condition(condition, env, pc)?;
                let branch_pc = pc.join(label);

                if taken {
                    self.execute_branch(body, env, branch_pc)
                } else if let Some(else_body) = else_body {
                    self.execute_branch(else_body, env, branch_pc)
                } else {
                    Ok(RuntimeValue::null())
                }
            }

            Stmt::While { condition, body, .. } => {
                loop {
                    let (taken, label) = self.eval_condition(condition, env, pc)?;
                    if !taken {
                        break;
                    }
                    self.execute_branch(body, env, pc.join(label))?;
                }
                Ok(RuntimeValue::null())
            }

            Stmt::Debug { expr, .. } => {
                let value = self.eval_expr(expr, env, pc)?;
                if value.label > SecurityLabel::Unclassified {
                    return Err(SecLangError::new(ErrorKind::DebugNotAllowed, Some(stmt.span())));
                }
                self.console.debug(&value.value);
                Ok(value)
            }

            Stmt::Input { message, target, .. } => self.input(message, target, env, pc),

            Stmt::Declassify { identifier, .. } => {
                relabel(identifier, env, SecurityLabel::declassify, "declassified")
            }

            Stmt::Downgrade { identifier, .. } => {
                relabel(identifier, env, SecurityLabel::downgrade, "downgraded")
            }

            Stmt::OpenChannel { name, mode, .. } => {
                env.open_channel(name, *mode)?;
                Ok(RuntimeValue::public(Value::Bool(true)))
            }

            Stmt::CloseChannel { name, .. } => {
                env.close_channel(name)?;
                Ok(RuntimeValue::public(Value::Bool(true)))
            }

            Stmt::Write { channel, value, .. } => self.write(channel, value, env, pc),
        }
    }

    fn declare(
        &mut self,
        declaration: Declaration<'_>,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        let Declaration {
            identifier,
            declared_type,
            declared_label,
            constant,
            initializer,
        } = declaration;

        let value = match initializer {
            None => RuntimeValue::new(Value::default_for(declared_type), declared_label),
            Some(expr) => {
                let (value, label) = self.eval_initializer(expr, env, pc)?;

                if value.value.var_type() != Some(declared_type) {
                    return Err(SecLangError::new(
                        ErrorKind::DeclarationTypeMismatch {
                            declared: declared_type.to_string(),
                            found: value.type_name().to_string(),
                        },
                        Some(expr.span()),
                    ));
                }

                let label = match label {
                    InitializerLabel::Declared => declared_label,
                    InitializerLabel::Flowed(label) => {
                        if !label.flows_to(declared_label) {
                            return Err(SecLangError::new(
                                ErrorKind::DeclarationFlow {
                                    name: identifier.to_string(),
                                    label,
                                },
                                Some(expr.span()),
                            ));
                        }
                        label
                    }
                    InitializerLabel::Joined(computed) => {
                        if !computed.flows_to(declared_label) {
                            return Err(SecLangError::new(
                                ErrorKind::IncoherentLabel {
                                    name: identifier.to_string(),
                                    declared: declared_label,
                                    computed,
                                },
                                Some(expr.span()),
                            ));
                        }
                        computed
                    }
                };
                value.relabel(label)
            }
        };

        env.declare(identifier, value, declared_type, constant)
    }

    /// Evaluate a declaration initializer together with the rule that
    /// decides the new variable's label
    fn eval_initializer(
        &mut self,
        expr: &Expr,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<(RuntimeValue, InitializerLabel)> {
        match expr {
            Expr::NumericLiteral { .. }
            | Expr::BooleanLiteral { .. }
            | Expr::StringLiteral { .. }
            | Expr::Read { .. } => Ok((self.eval_expr(expr, env, pc)?, InitializerLabel::Declared)),

            Expr::Binary { .. } => {
                let value = self.eval_expr(expr, env, pc)?;
                let joined = value.label;
                Ok((value, InitializerLabel::Joined(joined)))
            }

            Expr::Identifier { .. } | Expr::Assignment { .. } => {
                let value = self.eval_expr(expr, env, pc)?;
                let label = value.label;
                Ok((value, InitializerLabel::Flowed(label)))
            }
        }
    }

    fn input(
        &mut self,
        message: &str,
        target: &str,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        let current = env.lookup(target)?;
        Self::check_implicit_flow(target, current.label, pc)?;

        let line = self.console.input(message).map_err(|err| {
            SecLangError::new(ErrorKind::RuntimeError(format!("failed to read input: {}", err)), None)
        })?;

        let declared_type = env.declared_type(target)?;
        let value = match declared_type {
            VarType::String => Value::String(line),
            VarType::Int => line
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| invalid_input(target, declared_type))?,
            VarType::Bool => match line.trim().to_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(invalid_input(target, declared_type)),
            },
        };

        env.assign(target, RuntimeValue::new(value, current.label))
    }

    fn write(
        &mut self,
        channel: &str,
        value: &Expr,
        env: &mut Environment,
        pc: SecurityLabel,
    ) -> Result<RuntimeValue> {
        let class = env.channel_label(channel)?;
        let breach = || SecLangError::new(ErrorKind::ChannelWriteBreach(channel.to_string()), None);

        // A variable above the channel's class is refused whatever it holds
        if let Expr::Identifier { symbol, span } = value {
            let source = env.lookup(symbol).map_err(|e| e.or_at(*span))?;
            if !source.label.flows_to(class) {
                return Err(breach());
            }
        }

        if !env.channel(channel)?.is_open() {
            return Err(SecLangError::new(ErrorKind::ChannelNotOpen(channel.to_string()), None));
        }
        if env.channel(channel)?.mode() != AccessMode::Write {
            return Err(SecLangError::new(
                ErrorKind::WrongChannelMode { channel: channel.to_string(), mode: AccessMode::Read },
                None,
            ));
        }

        let data = self.eval_expr(value, env, pc)?;
        if !data.label.flows_to(class) {
            return Err(breach());
        }

        let written = env.write_channel(channel, &data.value.to_string())?;
        Ok(RuntimeValue::public(Value::Bool(written)))
    }
}

/// The parts of a `VarDeclaration` statement
struct Declaration<'a> {
    identifier: &'a str,
    declared_type: VarType,
    declared_label: SecurityLabel,
    constant: bool,
    initializer: Option<&'a Expr>,
}

/// How a declaration's label follows from its initializer
enum InitializerLabel {
    /// Literals and reads take the declared label
    Declared,
    /// A variable's own label, which may not exceed the declared one
    Flowed(SecurityLabel),
    /// Join of both operands, which may not exceed the declared one
    Joined(SecurityLabel),
}

fn relabel(
    identifier: &str,
    env: &mut Environment,
    step: fn(SecurityLabel) -> SecurityLabel,
    action: &'static str,
) -> Result<RuntimeValue> {
    let current = env.lookup(identifier)?;
    let relabeled = current.relabel(step(current.label));
    env.rebind(identifier, relabeled.clone())?;

    tracing::debug!(
        variable = identifier,
        from = %current.label,
        to = %relabeled.label,
        "{}",
        action
    );
    Ok(relabeled)
}

fn invalid_input(name: &str, expected: VarType) -> SecLangError {
    SecLangError::new(
        ErrorKind::InvalidInput { name: name.to_string(), expected: expected.to_string() },
        None,
    )
}
