//! Abstract Syntax Tree definitions for SecLang
//!
//! Represents the structure of programs after parsing. Every node carries
//! the span of the token that introduced it.

use std::fmt;

use crate::security::SecurityLabel;
use crate::token::Span;

/// Declared type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Int,
    String,
    Bool,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Int => write!(f, "int"),
            VarType::String => write!(f, "string"),
            VarType::Bool => write!(f, "bool"),
        }
    }
}

/// Access mode of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    /// Parse the `'r'` / `'w'` mode literal
    pub fn from_literal(literal: &str) -> Option<AccessMode> {
        match literal {
            "r" => Some(AccessMode::Read),
            "w" => Some(AccessMode::Write),
            _ => None,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => write!(f, "read"),
            AccessMode::Write => write!(f, "write"),
        }
    }
}

/// Where the value of a `read(...)` is headed, fixed at parse time
#[derive(Debug, Clone, PartialEq)]
pub enum ReadTarget {
    /// Initializer of a declaration; the label is the declared one
    Declaration { identifier: String, label: SecurityLabel },
    /// Right-hand side of `identifier = read(...)`; the label is the
    /// identifier's current label at evaluation time
    Assignment { identifier: String },
}

/// Expression nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Variable reference: foo
    Identifier { symbol: String, span: Span },

    /// Number literal: 42
    NumericLiteral { value: i64, span: Span },

    /// Boolean literal: true, false
    BooleanLiteral { value: bool, span: Span },

    /// String literal: 'hello'
    StringLiteral { value: String, span: Span },

    /// Binary operation: a + b, x < y
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },

    /// Assignment: x = expr
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },

    /// Channel read: read('Secret')
    Read {
        channel: String,
        target: Option<ReadTarget>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier { span, .. } => *span,
            Expr::NumericLiteral { span, .. } => *span,
            Expr::BooleanLiteral { span, .. } => *span,
            Expr::StringLiteral { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Assignment { span, .. } => *span,
            Expr::Read { span, .. } => *span,
        }
    }
}

/// Binary operators. Arithmetic and comparison share one precedence tier
/// except for `+` and `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,      // +
    Sub,      // -
    Mul,      // *
    Div,      // /
    Mod,      // %
    Eq,       // ==
    Ne,       // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Mod => write!(f, "%"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
        }
    }
}

/// Statement nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression statement (assignments and bare reads land here)
    Expr { expr: Expr },

    /// Declaration: [const] int x:S = expr
    VarDeclaration {
        constant: bool,
        identifier: String,
        declared_type: VarType,
        declared_label: SecurityLabel,
        value: Option<Expr>,
        span: Span,
    },

    /// if cond then ... [else ...] endif
    Conditional {
        condition: Expr,
        body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },

    /// while cond do ... endwhile
    While {
        condition: Expr,
        body: Vec<Stmt>,
        span: Span,
    },

    /// debug expr
    Debug { expr: Expr, span: Span },

    /// input x 'message'
    Input {
        message: String,
        target: String,
        span: Span,
    },

    /// declassify x
    Declassify { identifier: String, span: Span },

    /// downgrade x
    Downgrade { identifier: String, span: Span },

    /// open('Secret','r')
    OpenChannel {
        name: String,
        mode: AccessMode,
        span: Span,
    },

    /// close('Secret')
    CloseChannel { name: String, span: Span },

    /// write('Secret', expr)
    Write {
        channel: String,
        value: Expr,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr { expr } => expr.span(),
            Stmt::VarDeclaration { span, .. } => *span,
            Stmt::Conditional { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::Debug { span, .. } => *span,
            Stmt::Input { span, .. } => *span,
            Stmt::Declassify { span, .. } => *span,
            Stmt::Downgrade { span, .. } => *span,
            Stmt::OpenChannel { span, .. } => *span,
            Stmt::CloseChannel { span, .. } => *span,
            Stmt::Write { span, .. } => *span,
        }
    }
}

/// A complete program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}
