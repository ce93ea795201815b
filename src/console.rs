//! User-facing I/O for `debug` and `input`

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::value::Value;

/// Where `debug` output goes and where `input` lines come from
pub trait Console {
    fn debug(&mut self, value: &Value);

    /// Show the prompt and return one line, without its line ending
    fn input(&mut self, prompt: &str) -> io::Result<String>;
}

/// The process's stdin and stdout
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn debug(&mut self, value: &Value) {
        println!("{}", value);
    }

    fn input(&mut self, prompt: &str) -> io::Result<String> {
        print!("{} ", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Scripted input and captured output
#[derive(Debug, Default)]
pub struct BufferedConsole {
    inputs: VecDeque<String>,
    pub outputs: Vec<String>,
    pub prompts: Vec<String>,
}

impl BufferedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Console for BufferedConsole {
    fn debug(&mut self, value: &Value) {
        self.outputs.push(value.to_string());
    }

    fn input(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        self.inputs
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted input left"))
    }
}
