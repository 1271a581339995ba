use clap::Parser;
use lamb::cli::{generate_completions, AppConfig, Args, Commands};
use lamb::diagnostic::render_diagnostic;
use lamb::interpreter::{Interpreter, TokenParser};
use lamb::lexer::{tokenize, Token};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::path::Path;

fn main() {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return;
    }

    let config = AppConfig::from_args(&args);
    verbose_log(&config, "Starting lamb");

    if let Some(code) = &args.eval {
        let mut interpreter = Interpreter::new();
        if !run_source(code.trim(), "eval", &mut interpreter, false, &config) {
            std::process::exit(1);
        }
        return;
    }

    if let Some(script) = &args.script {
        let mut interpreter = Interpreter::new();
        if !run_script(script, &mut interpreter, &config) {
            std::process::exit(1);
        }
        return;
    }

    run_interactive(&config);
}

/// Tokenizes, parses, and evaluates one complete program against the given
/// interpreter. With `echo`, prints the token list, the AST, and a labeled
/// result, the way the interactive shell reports each input.
fn run_source(
    source: &str,
    origin: &str,
    interpreter: &mut Interpreter,
    echo: bool,
    config: &AppConfig,
) -> bool {
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(err) => {
            eprint!(
                "{}",
                render_diagnostic(source, origin, &err.to_diagnostic(), config.color_enabled)
            );
            return false;
        }
    };

    if echo {
        let kinds: Vec<&Token> = tokens.iter().map(|(tok, _)| tok).collect();
        println!("Tokens: {:?}", kinds);
    }

    let mut parser = TokenParser::from_lexer_output(tokens, source.len());
    let statements = match parser.parse() {
        Ok(statements) => statements,
        Err(err) => {
            eprint!(
                "{}",
                render_diagnostic(source, origin, &err.to_diagnostic(), config.color_enabled)
            );
            return false;
        }
    };

    if echo {
        println!("AST: {:?}", statements);
    }

    match interpreter.run(&statements) {
        Ok(Some(value)) => {
            if echo {
                println!("Result: {}", value);
            } else {
                println!("{}", value);
            }
            true
        }
        Ok(None) => true,
        Err(err) => {
            eprint!(
                "{}",
                render_diagnostic(source, origin, &err.to_diagnostic(), config.color_enabled)
            );
            false
        }
    }
}

/// Runs a script file as one program in the given interpreter, so `:load`
/// makes its definitions available to the rest of the session.
fn run_script(path: &Path, interpreter: &mut Interpreter, config: &AppConfig) -> bool {
    verbose_log(config, &format!("Running script: {}", path.display()));

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            error_message(config, &format!("Failed to read {}: {}", path.display(), err));
            return false;
        }
    };

    let origin = path.to_string_lossy();
    run_source(source.trim(), &origin, interpreter, true, config)
}

enum ReplOutcome {
    /// Input so far is a prefix of a longer program; keep buffering lines.
    Incomplete,
    Done,
}

/// Decides whether the buffered input is complete and, if so, runs it.
/// Input is incomplete when the failure sits at the very end of the buffer:
/// an unterminated string, or a parse error at the end-of-input token.
fn repl_step(
    source: &str,
    interpreter: &mut Interpreter,
    force: bool,
    config: &AppConfig,
) -> ReplOutcome {
    match tokenize(source) {
        Err(err) if !force && err.found.is_none() => return ReplOutcome::Incomplete,
        Err(_) => {}
        Ok(tokens) => {
            let mut parser = TokenParser::from_lexer_output(tokens, source.len());
            if let Err(err) = parser.parse() {
                if !force && err.span.start >= source.len() {
                    return ReplOutcome::Incomplete;
                }
            }
        }
    }

    run_source(source, "repl", interpreter, true, config);
    ReplOutcome::Done
}

fn run_interactive(config: &AppConfig) {
    println!("Interactive Functional Language Shell");
    println!("Type ':load <filename>' to load a file.");
    println!("Type ':exit' to quit.");
    println!("Type ':help' for a list of commands.");

    let mut interpreter = Interpreter::new();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { ">>> " } else { "... " };
        print!("{}", prompt);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                error_message(config, &format!("Error reading input: {}", err));
                break;
            }
        }
        let trimmed = line.trim();

        if buffer.is_empty() {
            match trimmed {
                "" => continue,
                "exit" | "quit" | ":exit" => {
                    println!("Exiting the REPL.");
                    break;
                }
                ":help" => {
                    print_help();
                    continue;
                }
                _ => {}
            }
            if trimmed == ":load" {
                error_message(config, "Usage: :load <filename>");
                continue;
            }
            if let Some(path) = trimmed.strip_prefix(":load ") {
                // A failed load leaves the session (and any definitions made
                // before the failure) alive.
                run_script(Path::new(path.trim()), &mut interpreter, config);
                continue;
            }
        }

        // An empty line forces evaluation of whatever has been buffered.
        let force = trimmed.is_empty();
        buffer.push_str(&line);
        match repl_step(buffer.trim(), &mut interpreter, force, config) {
            ReplOutcome::Incomplete => {}
            ReplOutcome::Done => buffer.clear(),
        }
    }
}

fn print_help() {
    println!("Available commands:");
    println!(":load <filename> - Load and execute a script file");
    println!(":exit - Exit the REPL");
    println!(":help - Show this help message");
}

fn verbose_log(config: &AppConfig, message: &str) {
    if config.verbose {
        eprintln!("[lamb:debug] {}", message);
    }
}

fn error_message(config: &AppConfig, message: &str) {
    if config.color_enabled {
        eprintln!("{}", message.red().bold());
    } else {
        eprintln!("{}", message);
    }
}
