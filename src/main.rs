use std::io::{self, IsTerminal, Read};
use std::process;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use minilisp::eval::Machine;
use minilisp::printer;
use minilisp::reader;
use minilisp::symbol::sym;
use minilisp::value::Value;

const HEAP_CAPACITY: usize = 64 * 1024 * 1024;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut trace = false;
    let mut load_files: Vec<String> = Vec::new();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--load" => {
                if i + 1 < args.len() {
                    load_files.push(args[i + 1].clone());
                    i += 2;
                } else {
                    eprintln!("--load requires a file path");
                    process::exit(1);
                }
            }
            "--trace" => {
                trace = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: minilisp [OPTIONS] [SCRIPT]...");
                println!();
                println!("Options:");
                println!("  --load <file>    Load a source file before starting the REPL");
                println!("  --trace          Print each dispatched form to stderr");
                println!("  --help, -h       Show this help message");
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("Try 'minilisp --help' for usage information.");
                process::exit(1);
            }
            other => {
                load_files.push(other.to_string());
                i += 1;
            }
        }
    }

    let mut machine = Machine::new(HEAP_CAPACITY);
    machine.trace = trace;

    for path in &load_files {
        run_file(&mut machine, path);
    }

    if io::stdin().is_terminal() {
        repl(&mut machine);
    } else {
        run_piped(&mut machine);
    }
}

/// Piped mode: read all input, then evaluate form by form.
fn run_piped(machine: &mut Machine) {
    let mut input = String::new();
    if io::stdin().read_to_string(&mut input).is_err() {
        return;
    }
    if let ReplOutcome::ParseFailed = eval_buffer(machine, &input) {
        println!("\nParse failed.");
    }
}

/// Load a script before the REPL starts. A missing file is fatal; a bad
/// form inside it is reported and the rest of the file is skipped.
fn run_file(machine: &mut Machine, path: &str) {
    let source = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error loading {}: {}", path, e);
            process::exit(1);
        }
    };

    let mut pos = 0;
    loop {
        match reader::read_one_at(&source, pos, &mut machine.heap, &mut machine.symbols) {
            Ok(Some((form, next))) => {
                pos = next;
                if let Err(e) = machine.eval_top(form) {
                    println!("Exception error: {}", e);
                }
            }
            Ok(None) => break,
            Err(_) => {
                println!("\nParse failed.");
                break;
            }
        }
    }
}

enum ReplOutcome {
    Continue,
    Exit,
    ParseFailed,
}

fn repl(machine: &mut Machine) {
    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to initialize line editor: {}", e);
            return;
        }
    };

    let mut buf = String::new();
    loop {
        let prompt = if buf.is_empty() { ">> " } else { "   " };
        match rl.readline(prompt) {
            Ok(line) => {
                buf.push_str(&line);
                buf.push('\n');

                // Keep reading continuation lines until parens balance.
                if !balanced(&buf) {
                    continue;
                }

                let input = std::mem::take(&mut buf);
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match eval_buffer(machine, &input) {
                    ReplOutcome::Continue => {}
                    ReplOutcome::Exit => break,
                    ReplOutcome::ParseFailed => {
                        println!("\nParse failed.");
                        break;
                    }
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}

/// Evaluate every form in a complete input buffer. Results print one per
/// line; the exact symbol `exit` as a result ends the session.
fn eval_buffer(machine: &mut Machine, input: &str) -> ReplOutcome {
    let mut pos = 0;
    loop {
        match reader::read_one_at(input, pos, &mut machine.heap, &mut machine.symbols) {
            Ok(Some((form, next))) => {
                pos = next;
                match machine.eval_top(form) {
                    Ok(val) => {
                        println!(
                            "{}",
                            printer::print_val(val, &machine.heap, &machine.symbols)
                        );
                        if val == Value::Symbol(sym::EXIT) {
                            return ReplOutcome::Exit;
                        }
                    }
                    Err(e) => println!("Exception error: {}", e),
                }
            }
            Ok(None) => return ReplOutcome::Continue,
            Err(_) => return ReplOutcome::ParseFailed,
        }
    }
}

/// Count paren depth outside strings and comments, to decide when the
/// buffered input holds complete forms. Naive but sufficient for
/// interactive input.
fn balanced(input: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut in_comment = false;
    let mut escaped = false;

    for ch in input.bytes() {
        if in_comment {
            if ch == b'\n' || ch == b'\r' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == b'\\' {
                escaped = true;
            } else if ch == b'"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'"' => in_string = true,
            b';' => in_comment = true,
            _ => {}
        }
    }

    depth <= 0 && !in_string
}
