//! Ash CLI: run a script file or start the REPL.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::env;
use std::fs;
use std::process;

use colored::Colorize;

use ash::bytecode::{Compiler, VM};
use ash::lexer::Scanner;
use ash::parser::Parser;
use ash::repl::Repl;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.len() {
        1 => {
            println!("Ash {}", VERSION);
            Repl::new().run();
        }
        2 => {
            if args[1] == "-v" || args[1] == "--version" {
                println!("Ash {}", VERSION);
            } else {
                run_file(&args[1]);
            }
        }
        _ => {
            eprintln!("usage: ash [file]");
            process::exit(1);
        }
    }
}

/// Compile and execute a source file. Any failure prints to stderr and
/// exits with status 1.
fn run_file(path: &str) {
    let mut filename = path.to_string();
    if !filename.ends_with(".ash") {
        filename.push_str(".ash");
    }

    let source = match fs::read_to_string(&filename) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("could not read {}: {}", filename, err);
            process::exit(1);
        }
    };

    let tokens = match Scanner::new(&source).scan_tokens() {
        Ok(tokens) => tokens,
        Err(err) => {
            eprintln!("{}{}", "error: ".red(), err);
            process::exit(1);
        }
    };

    let program = match Parser::new(tokens).parse() {
        Ok(program) => program,
        Err(errors) => {
            for err in errors {
                eprintln!("{}{}", "error: ".red(), err);
            }
            process::exit(1);
        }
    };

    let bytecode = match Compiler::new().compile(&program) {
        Ok(bytecode) => bytecode,
        Err(err) => {
            eprintln!("Compilation failed:\n {}", err);
            process::exit(1);
        }
    };

    let mut vm = VM::new(&bytecode);
    if let Err(err) = vm.run() {
        eprintln!("Executing bytecode failed:\n {}", err);
        process::exit(1);
    }
}
