//! Runtime value types for SecLang

use std::fmt;

use crate::ast::VarType;
use crate::security::SecurityLabel;

/// Runtime values in SecLang
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Result of statements that produce nothing
    Null,

    /// Integer value
    Int(i64),

    /// Boolean value
    Bool(bool),

    /// String value
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
        }
    }

    /// The declarable type of this value; `None` for `Null`
    pub fn var_type(&self) -> Option<VarType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(VarType::Int),
            Value::Bool(_) => Some(VarType::Bool),
            Value::String(_) => Some(VarType::String),
        }
    }

    /// Zero value of a declared type
    pub fn default_for(var_type: VarType) -> Value {
        match var_type {
            VarType::Int => Value::Int(0),
            VarType::Bool => Value::Bool(false),
            VarType::String => Value::String(String::new()),
        }
    }

    /// Reinterpret one line of channel content. Lines holding a valid
    /// integer become `Int`, everything else stays a `String`.
    pub fn from_channel_line(line: &str) -> Value {
        match line.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::String(line.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

/// A value together with its security label. Relabeling builds a new
/// value; existing ones are never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeValue {
    pub value: Value,
    pub label: SecurityLabel,
}

impl RuntimeValue {
    pub fn new(value: Value, label: SecurityLabel) -> Self {
        Self { value, label }
    }

    /// An `Unclassified` value
    pub fn public(value: Value) -> Self {
        Self::new(value, SecurityLabel::Unclassified)
    }

    pub fn null() -> Self {
        Self::public(Value::Null)
    }

    pub fn int(n: i64, label: SecurityLabel) -> Self {
        Self::new(Value::Int(n), label)
    }

    pub fn bool(b: bool, label: SecurityLabel) -> Self {
        Self::new(Value::Bool(b), label)
    }

    pub fn string(s: impl Into<String>, label: SecurityLabel) -> Self {
        Self::new(Value::String(s.into()), label)
    }

    /// A copy carrying a different label
    pub fn relabel(&self, label: SecurityLabel) -> Self {
        Self::new(self.value.clone(), label)
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
