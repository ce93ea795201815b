//! SecLang - an interpreter with a multi-level information-flow type system
//!
//! Every value carries a security label from `Unclassified` up to
//! `TopSecret`. Assignments, branches, and channel I/O are checked against
//! the label lattice while the program runs.

pub mod token;
pub mod lexer;
pub mod parser;
pub mod ast;
pub mod security;
pub mod value;
pub mod store;
pub mod channel;
pub mod environment;
pub mod console;
pub mod config;
pub mod error;
pub mod interpreter;

pub use config::{RunMode, SecLangConfig};
pub use console::{BufferedConsole, Console, StdConsole};
pub use environment::{Environment, VariableInfo};
pub use error::{ErrorCategory, ErrorKind, Result, SecLangError};
pub use interpreter::{last_value, Interpreter};
pub use lexer::Lexer;
pub use parser::{produce_ast, Parser};
pub use security::SecurityLabel;
pub use value::{RuntimeValue, Value};

/// Convenience function to run SecLang code with the default channels
/// held in memory
pub fn run(source: &str) -> Result<Vec<RuntimeValue>> {
    let program = produce_ast(source).map_err(|e| e.with_source(source))?;
    let mut env = Environment::in_memory(&SecLangConfig::default())?;
    let mut interpreter = Interpreter::new();

    interpreter
        .evaluate_program(&program, &mut env)
        .map_err(|e| e.with_source(source))
}

/// Version of the SecLang interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
