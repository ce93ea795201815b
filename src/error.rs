//! Error types for SecLang
//!
//! Provides structured error handling with source locations. Every
//! failure halts the whole program; there is no recovery inside the core.

use std::fmt;

use crate::ast::{AccessMode, BinaryOp};
use crate::config::ConfigError;
use crate::security::SecurityLabel;
use crate::token::Span;

/// The error taxonomy reported across the external boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Lexical,
    Syntax,
    ChannelNesting,
    Type,
    Security,
    Channel,
    Resolution,
    Runtime,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Lexical => "LexicalError",
            ErrorCategory::Syntax => "SyntaxError",
            ErrorCategory::ChannelNesting => "ChannelNestingError",
            ErrorCategory::Type => "TypeError",
            ErrorCategory::Security => "SecurityError",
            ErrorCategory::Channel => "ChannelError",
            ErrorCategory::Resolution => "ResolutionError",
            ErrorCategory::Runtime => "RuntimeError",
            ErrorCategory::Config => "ConfigError",
        };
        write!(f, "{}", name)
    }
}

/// Error kinds in SecLang
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Lexer errors
    UnexpectedCharacter(char),
    InvalidNumber(String),

    // Parser errors
    ExpectedToken(String, String),
    UnexpectedToken(String),
    NonIntegerLiteral(String),
    ConstWithoutValue(String),
    InvalidAccessMode(String),

    // Channel nesting errors (parse time)
    CloseWithoutOpen,
    CloseUnopened(String),
    CloseOutOfOrder { expected: String, found: String },

    // Type errors
    DeclarationTypeMismatch { declared: String, found: String },
    AssignmentTypeMismatch { expected: String, found: String },
    InvalidOperands { op: BinaryOp, left: String, right: String },
    NonBooleanCondition(String),

    // Security errors
    AssignmentFlow { name: String, label: SecurityLabel },
    DeclarationFlow { name: String, label: SecurityLabel },
    IncoherentLabel { name: String, declared: SecurityLabel, computed: SecurityLabel },
    ImplicitFlow(String),
    NestedImplicitFlow(&'static str),
    ChannelWriteBreach(String),
    ChannelReadBreach(String),
    DebugNotAllowed,

    // Channel errors
    UnsupportedChannel(String),
    ChannelNotOpen(String),
    ChannelNeverOpened(String),
    WrongChannelMode { channel: String, mode: AccessMode },
    ChannelStore(String),

    // Resolution errors
    UndefinedVariable(String),
    AlreadyDeclared(String),
    ConstantReassignment(String),
    InvalidAssignmentTarget,

    // Runtime errors
    DivisionByZero,
    IntegerOverflow,
    StringTooLong { limit: usize },
    InvalidInput { name: String, expected: String },
    RuntimeError(String),

    // Configuration errors
    Config(String),
}

impl ErrorKind {
    /// Where this kind sits in the error taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::UnexpectedCharacter(_) | ErrorKind::InvalidNumber(_) => ErrorCategory::Lexical,

            ErrorKind::ExpectedToken(..)
            | ErrorKind::UnexpectedToken(_)
            | ErrorKind::NonIntegerLiteral(_)
            | ErrorKind::ConstWithoutValue(_) => ErrorCategory::Syntax,

            ErrorKind::CloseWithoutOpen
            | ErrorKind::CloseUnopened(_)
            | ErrorKind::CloseOutOfOrder { .. } => ErrorCategory::ChannelNesting,

            ErrorKind::DeclarationTypeMismatch { .. }
            | ErrorKind::AssignmentTypeMismatch { .. }
            | ErrorKind::InvalidOperands { .. }
            | ErrorKind::NonBooleanCondition(_) => ErrorCategory::Type,

            ErrorKind::AssignmentFlow { .. }
            | ErrorKind::DeclarationFlow { .. }
            | ErrorKind::IncoherentLabel { .. }
            | ErrorKind::ImplicitFlow(_)
            | ErrorKind::NestedImplicitFlow(_)
            | ErrorKind::ChannelWriteBreach(_)
            | ErrorKind::ChannelReadBreach(_)
            | ErrorKind::DebugNotAllowed => ErrorCategory::Security,

            ErrorKind::InvalidAccessMode(_)
            | ErrorKind::UnsupportedChannel(_)
            | ErrorKind::ChannelNotOpen(_)
            | ErrorKind::ChannelNeverOpened(_)
            | ErrorKind::WrongChannelMode { .. }
            | ErrorKind::ChannelStore(_) => ErrorCategory::Channel,

            ErrorKind::UndefinedVariable(_)
            | ErrorKind::AlreadyDeclared(_)
            | ErrorKind::ConstantReassignment(_)
            | ErrorKind::InvalidAssignmentTarget => ErrorCategory::Resolution,

            ErrorKind::DivisionByZero
            | ErrorKind::IntegerOverflow
            | ErrorKind::StringTooLong { .. }
            | ErrorKind::InvalidInput { .. }
            | ErrorKind::RuntimeError(_) => ErrorCategory::Runtime,

            ErrorKind::Config(_) => ErrorCategory::Config,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnexpectedCharacter(c) => write!(f, "unrecognized character '{}'", c),
            ErrorKind::InvalidNumber(s) => write!(f, "invalid number '{}'", s),
            ErrorKind::ExpectedToken(expected, got) => {
                write!(f, "{}, found '{}'", expected, got)
            }
            ErrorKind::UnexpectedToken(t) => write!(f, "unexpected token '{}'", t),
            ErrorKind::NonIntegerLiteral(s) => {
                write!(f, "numeric literal '{}' is not an int", s)
            }
            ErrorKind::ConstWithoutValue(name) => {
                write!(f, "must assign value to constant '{}' at declaration", name)
            }
            ErrorKind::InvalidAccessMode(mode) => {
                write!(f, "invalid access mode '{}', expected 'r' or 'w'", mode)
            }
            ErrorKind::CloseWithoutOpen => {
                write!(f, "attempting to close a channel, but no channel is open")
            }
            ErrorKind::CloseUnopened(name) => {
                write!(f, "attempting to close channel '{}' that is not open or does not exist", name)
            }
            ErrorKind::CloseOutOfOrder { expected, found } => write!(
                f,
                "channels must be closed in reverse open order: expected '{}' to be closed before '{}'",
                expected, found
            ),
            ErrorKind::DeclarationTypeMismatch { declared, found } => write!(
                f,
                "type mismatch at variable declaration: can't assign '{}' to '{}'",
                found, declared
            ),
            ErrorKind::AssignmentTypeMismatch { expected, found } => write!(
                f,
                "type mismatch at variable assignment: can't assign '{}' to '{}'",
                found, expected
            ),
            ErrorKind::InvalidOperands { op, left, right } => write!(
                f,
                "unsupported operator '{}' for operands '{}' and '{}'",
                op, left, right
            ),
            ErrorKind::NonBooleanCondition(found) => {
                write!(f, "condition must be 'bool', found '{}'", found)
            }
            ErrorKind::AssignmentFlow { name, label } => write!(
                f,
                "information flow security breached: '{}' security class is lower than {}",
                name, label
            ),
            ErrorKind::DeclarationFlow { name, label } => write!(
                f,
                "information flow security breached: '{}' security class is lower than {}",
                name, label
            ),
            ErrorKind::IncoherentLabel { name, declared, computed } => write!(
                f,
                "incoherence between security class definition of '{}' ({}) and evaluated security class ({})",
                name, declared, computed
            ),
            ErrorKind::ImplicitFlow(name) => write!(
                f,
                "implicit information flow security breached: check assignment of '{}'",
                name
            ),
            ErrorKind::NestedImplicitFlow(kind) => write!(
                f,
                "implicit information flow security breached: check nested {} statements",
                kind
            ),
            ErrorKind::ChannelWriteBreach(channel) => write!(
                f,
                "channel write operation on '{}' failed: channel security breached",
                channel
            ),
            ErrorKind::ChannelReadBreach(channel) => write!(
                f,
                "channel read operation on '{}' failed: channel security breached",
                channel
            ),
            // The label is left out on purpose: the message must not leak it
            ErrorKind::DebugNotAllowed => write!(f, "debug not allowed"),
            ErrorKind::UnsupportedChannel(name) => write!(f, "channel '{}' is not supported", name),
            ErrorKind::ChannelNotOpen(name) => write!(f, "channel '{}' is not open", name),
            ErrorKind::ChannelNeverOpened(name) => {
                write!(f, "channel '{}' was never opened", name)
            }
            ErrorKind::WrongChannelMode { channel, mode } => write!(
                f,
                "channel '{}' is open for {}; operation not permitted",
                channel, mode
            ),
            ErrorKind::ChannelStore(msg) => write!(f, "channel store failure: {}", msg),
            ErrorKind::UndefinedVariable(name) => {
                write!(f, "cannot resolve '{}' as it does not exist", name)
            }
            ErrorKind::AlreadyDeclared(name) => {
                write!(f, "cannot declare variable '{}' as it is already defined in scope", name)
            }
            ErrorKind::ConstantReassignment(name) => {
                write!(f, "cannot reassign to '{}' as it is declared as a constant", name)
            }
            ErrorKind::InvalidAssignmentTarget => {
                write!(f, "invalid assignment target, expected an identifier")
            }
            ErrorKind::DivisionByZero => write!(f, "division by zero"),
            ErrorKind::IntegerOverflow => write!(f, "integer overflow"),
            ErrorKind::StringTooLong { limit } => {
                write!(f, "string result would exceed {} bytes", limit)
            }
            ErrorKind::InvalidInput { name, expected } => {
                write!(f, "invalid input for {} variable '{}'", expected, name)
            }
            ErrorKind::RuntimeError(msg) => write!(f, "{}", msg),
            ErrorKind::Config(msg) => write!(f, "{}", msg),
        }
    }
}

/// A SecLang error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct SecLangError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub source_line: Option<String>,
}

impl SecLangError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            source_line: None,
        }
    }

    /// Attach a span if the error does not carry one yet
    pub fn or_at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &self.span {
            let lines: Vec<&str> = source.lines().collect();
            if span.line > 0 && span.line <= lines.len() {
                self.source_line = Some(lines[span.line - 1].to_string());
            }
        }
        self
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// The message without location or category
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }
}

impl fmt::Display for SecLangError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "[line {}:{}] {}: {}", span.line, span.column, self.category(), self.kind)?;

            if let Some(ref line) = self.source_line {
                write!(f, "\n  | {}", line)?;
                write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
            }
        } else {
            write!(f, "{}: {}", self.category(), self.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for SecLangError {}

impl From<ConfigError> for SecLangError {
    fn from(err: ConfigError) -> Self {
        SecLangError::new(ErrorKind::Config(err.to_string()), None)
    }
}

/// Result type for SecLang operations
pub type Result<T> = std::result::Result<T, SecLangError>;
