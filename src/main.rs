//! SecLang CLI and REPL
//!
//! Usage:
//!   seclang run <file.sl>      - Execute a SecLang file
//!   seclang check <file.sl>    - Lex and parse only
//!   seclang tokens <file.sl>   - Dump the token stream
//!   seclang repl               - Start interactive REPL

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use seclang::{
    last_value, Environment, Interpreter, Lexer, Parser, SecLangConfig, SecLangError, VERSION,
};

/// Interpreter for a language with information-flow security labels
#[derive(ClapParser, Debug)]
#[command(name = "seclang")]
#[command(version = VERSION)]
#[command(about = "Interpreter for SecLang, a language with information-flow security labels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a SecLang file
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// TOML configuration file
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,

        /// Session identifier used to namespace channel files
        #[arg(long)]
        session: Option<String>,

        /// Keep channels in memory instead of on disk
        #[arg(long)]
        memory: bool,

        /// Print variables and channel contents afterwards
        #[arg(long)]
        state: bool,
    },

    /// Lex and parse a file without running it
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Dump the token stream of a file
    Tokens {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Start interactive REPL
    Repl {
        /// TOML configuration file
        #[arg(long, value_name = "TOML")]
        config: Option<PathBuf>,
    },
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { file, config, session, memory, state } => {
            let config = load_config(config.as_deref());
            run_file(&file, &config, session, memory, state);
        }
        Command::Check { file } => check_file(&file),
        Command::Tokens { file } => dump_tokens(&file),
        Command::Repl { config } => {
            let config = load_config(config.as_deref());
            run_repl(&config);
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", "error".red(), message);
    process::exit(1);
}

fn report(err: SecLangError, source: &str) -> ! {
    eprintln!("{}", err.with_source(source).to_string().red());
    process::exit(1);
}

fn load_config(path: Option<&Path>) -> SecLangConfig {
    match path {
        Some(path) => SecLangConfig::from_file(path).unwrap_or_else(|e| fail(e)),
        None => SecLangConfig::default(),
    }
}

fn read_source(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap_or_else(|e| fail(format!("cannot read file '{}': {}", path.display(), e)))
}

fn run_file(path: &Path, config: &SecLangConfig, session: Option<String>, memory: bool, state: bool) {
    let source = read_source(path);

    let program = seclang::produce_ast(&source).unwrap_or_else(|e| report(e, &source));

    let env = if memory {
        Environment::in_memory(config)
    } else {
        Environment::with_file_store(config, session)
    };
    let mut env = env.unwrap_or_else(|e| fail(e));

    let mut interpreter = Interpreter::new();
    let results = interpreter
        .evaluate_program(&program, &mut env)
        .unwrap_or_else(|e| report(e, &source));

    if let Some(value) = last_value(&results) {
        println!("{} {}", "=>".dimmed(), value.to_string().cyan());
    }

    if state {
        print_variables(&env);
        print_channels(&env);
    }
}

fn check_file(path: &Path) {
    let source = read_source(path);
    let program = seclang::produce_ast(&source).unwrap_or_else(|e| report(e, &source));
    println!(
        "{} {} ({} statements)",
        "ok".green().bold(),
        path.display(),
        program.body.len()
    );
}

fn dump_tokens(path: &Path) {
    let source = read_source(path);
    let tokens = Lexer::new(&source).tokenize().unwrap_or_else(|e| report(e, &source));
    for token in tokens {
        println!("{:>7}  {:<24} {}", token.span.to_string().dimmed(), format!("{:?}", token.kind), token.lexeme);
    }
}

fn print_variables(env: &Environment) {
    println!("{}", "Variables:".yellow());
    for var in env.variables() {
        let constant = if var.constant { " const" } else { "" };
        println!("  {:<16} {} {}{}", var.name, var.label_level, var.label_name, constant.dimmed());
    }
}

fn print_channels(env: &Environment) {
    println!("{}", "Channels:".yellow());
    match env.channel_contents() {
        Ok(contents) => {
            for (name, text) in contents {
                println!("  {}", name.cyan());
                for line in text.lines() {
                    println!("    {}", line);
                }
            }
        }
        Err(e) => eprintln!("{}", e.to_string().red()),
    }
}

fn run_repl(config: &SecLangConfig) {
    println!("{} {} - {}",
        "SecLang".cyan().bold(),
        VERSION.cyan(),
        "information-flow secure by default".dimmed()
    );
    println!("Type {} to exit, {} for help\n",
        "exit".yellow(),
        "help".yellow()
    );

    let mut rl = DefaultEditor::new().unwrap_or_else(|e| fail(format!("failed to create REPL: {}", e)));

    // Variables and open channels persist across lines
    let mut env = Environment::in_memory(config).unwrap_or_else(|e| fail(e));
    let mut open_channels: Vec<String> = Vec::new();
    let mut interpreter = Interpreter::new();

    loop {
        match rl.readline(&format!("{} ", "sl>".green().bold())) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    "exit" | "quit" => {
                        println!("{}", "Goodbye!".cyan());
                        break;
                    }
                    "help" => {
                        print_repl_help();
                        continue;
                    }
                    "clear" => {
                        env = Environment::in_memory(config).unwrap_or_else(|e| fail(e));
                        open_channels.clear();
                        println!("{}", "State cleared.".dimmed());
                        continue;
                    }
                    "vars" => {
                        print_variables(&env);
                        continue;
                    }
                    "channels" => {
                        print_channels(&env);
                        continue;
                    }
                    _ => {}
                }

                let tokens = match Lexer::new(line).tokenize() {
                    Ok(t) => t,
                    Err(e) => {
                        eprintln!("{}", e.with_source(line).to_string().red());
                        continue;
                    }
                };

                let mut parser = Parser::new(tokens).with_open_channels(open_channels.clone());
                let program = match parser.parse() {
                    Ok(p) => p,
                    Err(e) => {
                        eprintln!("{}", e.with_source(line).to_string().red());
                        continue;
                    }
                };
                open_channels = parser.open_channels().to_vec();

                match interpreter.evaluate_program(&program, &mut env) {
                    Ok(results) => {
                        if let Some(value) = last_value(&results) {
                            println!("{} {}", "=>".dimmed(), value.to_string().cyan());
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", e.with_source(line).to_string().red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }
}

fn print_repl_help() {
    println!("{}", "REPL Commands:".yellow());
    println!("  exit, quit   Exit the REPL");
    println!("  clear        Forget all variables and channel contents");
    println!("  vars         Show variables with their security classes");
    println!("  channels     Show the contents of every channel");
    println!("  help         Show this help\n");
    println!("{}", "Language Examples:".yellow());
    println!("  int x:S = 42");
    println!("  string msg = 'hello'");
    println!("  if x > 0 then x = x - 1 endif");
    println!("  open('Secret','w') write('Secret', x) close('Secret')");
    println!("  downgrade x");
    println!("  debug msg");
}
