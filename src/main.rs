#![allow(dead_code)]

use std::fs;

use rustyline::Editor;

// Declaring crate-level modules
mod chunk;
mod compiler;
mod errors;
mod lexer;
mod memory;
mod objects;
mod virtual_machine;

#[cfg(test)]
mod tests;

use virtual_machine::{InterpretResult, VM};

/// The main function
fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let code = match args.len() {
        0 => run_repl(),
        1 => run_file(&args[0]),
        _ => {
            display_usage();
            exitcode::OK
        }
    };

    std::process::exit(code);
}

/// Reads and interprets a script file.
///
/// ## Arguments
/// * `path` – The path of the script to execute.
///
/// ## Returns
/// `exitcode::ExitCode` – The exit code for the process.
fn run_file(path: &str) -> exitcode::ExitCode {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            eprintln!("Could not read file '{}': {}", path, error);
            return exitcode::DATAERR;
        }
    };

    match VM::interpret(&contents) {
        InterpretResult::Ok => exitcode::OK,
        InterpretResult::CompileError => exitcode::DATAERR,
        InterpretResult::RuntimeError => exitcode::SOFTWARE,
    }
}

/// Runs the interactive prompt until the user quits. Every line is
/// compiled and executed in a fresh interpreter.
fn run_repl() -> exitcode::ExitCode {
    println!("Interactive mode. Type \"quit()\" or press CTRL-D to exit.");

    let mut editor = Editor::<()>::new();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim() == "quit()" {
                    break;
                }

                editor.add_history_entry(&line);
                VM::interpret(&line);
            }
            Err(_) => break,
        }
    }

    exitcode::OK
}

fn display_usage() {
    println!("Usage: corvus [script]");
}
