//! Interactive REPL for Ash.

use std::io::{self, BufRead, Write};

use colored::Colorize;

use crate::bytecode::{Compiler, Value, GLOBALS_SIZE, VM};
use crate::lexer::Scanner;
use crate::parser::Parser;

/// One interactive session. The compiler (symbol table + constant pool)
/// and the globals vector persist across input lines.
pub struct Repl {
    compiler: Compiler,
    globals: Vec<Value>,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            compiler: Compiler::new(),
            globals: vec![Value::Null; GLOBALS_SIZE],
        }
    }

    /// Read lines from stdin until EOF, printing each result.
    pub fn run(&mut self) {
        let stdin = io::stdin();

        loop {
            print!("{}", ">> ".cyan());
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }

            if line.trim().is_empty() {
                continue;
            }
            self.eval_line(&line);
        }
    }

    /// Compile and run one line. Errors abort the line but leave the
    /// session (globals, constants, symbols) alive.
    fn eval_line(&mut self, line: &str) {
        let tokens = match Scanner::new(line).scan_tokens() {
            Ok(tokens) => tokens,
            Err(err) => {
                println!("{}{}", "error: ".red(), err);
                return;
            }
        };

        let program = match Parser::new(tokens).parse() {
            Ok(program) => program,
            Err(errors) => {
                for err in errors {
                    println!("{}{}", "error: ".red(), err);
                }
                return;
            }
        };

        let bytecode = match self.compiler.compile(&program) {
            Ok(bytecode) => bytecode,
            Err(err) => {
                println!("Compilation failed:\n {}", err);
                return;
            }
        };

        let mut vm = VM::with_globals_store(&bytecode, std::mem::take(&mut self.globals));
        match vm.run() {
            Ok(()) => println!("{}", vm.last_popped()),
            Err(err) => println!("Executing bytecode failed:\n {}", err),
        }
        self.globals = vm.into_globals();
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}
