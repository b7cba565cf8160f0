//! Bytecode compiler: transforms AST into bytecode.

use std::rc::Rc;

use crate::ast::{BinaryOp, Block, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};
use crate::bytecode::instruction::{make, OpCode};
use crate::bytecode::symbol_table::{SymbolScope, SymbolTable};
use crate::bytecode::value::{CompiledFunction, Value};
use crate::error::CompileError;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Placeholder operand for jumps that are back-patched later.
const PLACEHOLDER: usize = 0xFFFF;

/// The output of compilation: the main instruction buffer plus the
/// constant pool shared by every function compiled with it.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
}

/// The position and opcode of an emitted instruction, tracked so jump
/// operands can be back-patched and a trailing Pop rewritten.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: OpCode,
    position: usize,
}

/// Instruction buffer for one function being compiled.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Vec<u8>,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
}

/// The bytecode compiler.
///
/// The symbol table and constant pool survive across `compile` calls, so a
/// REPL can feed one line at a time and keep its definitions.
pub struct Compiler {
    constants: Vec<Value>,
    symbols: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
            symbols: SymbolTable::new(),
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Compile a program into bytecode.
    pub fn compile(&mut self, program: &Program) -> CompileResult<Bytecode> {
        self.scopes = vec![CompilationScope::default()];

        let result = program
            .statements
            .iter()
            .try_for_each(|stmt| self.compile_statement(stmt));

        if result.is_err() {
            // Drop any half-open function scopes so the next compile on
            // this compiler starts clean.
            while self.symbols.depth() > 1 {
                self.symbols.pop_scope();
            }
            self.scopes.truncate(1);
        }
        result?;

        let main = self.scopes.pop().unwrap_or_default();
        self.scopes.push(CompilationScope::default());

        Ok(Bytecode {
            instructions: main.instructions,
            constants: self.constants.clone(),
        })
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(OpCode::Pop, &[]);
            }

            StmtKind::Let { name, value } => {
                // Defined before the initializer compiles, so a function
                // literal can refer to its own name.
                let symbol = self.symbols.define(name);
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(OpCode::SetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(OpCode::SetLocal, &[symbol.index]),
                };
            }

            StmtKind::Return(value) => {
                self.compile_expression(value)?;
                self.emit(OpCode::Return, &[]);
            }
        }

        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::IntLiteral(n) => {
                let index = self.add_constant(Value::Int(*n));
                self.emit(OpCode::Constant, &[index]);
            }

            ExprKind::StringLiteral(s) => {
                let index = self.add_constant(Value::String(Rc::new(s.clone())));
                self.emit(OpCode::Constant, &[index]);
            }

            ExprKind::BoolLiteral(true) => {
                self.emit(OpCode::True, &[]);
            }
            ExprKind::BoolLiteral(false) => {
                self.emit(OpCode::False, &[]);
            }
            ExprKind::Null => {
                self.emit(OpCode::Null, &[]);
            }

            ExprKind::Variable(name) => {
                let symbol = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(symbol.scope, symbol.index);
            }

            ExprKind::Unary { operator, operand } => {
                self.compile_expression(operand)?;
                match operator {
                    UnaryOp::Negate => self.emit(OpCode::Negate, &[]),
                    UnaryOp::Not => self.emit(OpCode::Not, &[]),
                };
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                // a < b compiles as b > a.
                if *operator == BinaryOp::Less {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(OpCode::Greater, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match operator {
                    BinaryOp::Add => self.emit(OpCode::Add, &[]),
                    BinaryOp::Subtract => self.emit(OpCode::Subtract, &[]),
                    BinaryOp::Multiply => self.emit(OpCode::Multiply, &[]),
                    BinaryOp::Divide => self.emit(OpCode::Divide, &[]),
                    BinaryOp::Equal => self.emit(OpCode::Equal, &[]),
                    BinaryOp::NotEqual => self.emit(OpCode::NotEqual, &[]),
                    BinaryOp::Greater => self.emit(OpCode::Greater, &[]),
                    BinaryOp::Less => unreachable!("handled above"),
                };
            }

            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;

                let jump_if_false_pos = self.emit(OpCode::JumpIfFalse, &[PLACEHOLDER]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(OpCode::Pop) {
                    self.remove_last_pop();
                }

                let jump_pos = self.emit(OpCode::Jump, &[PLACEHOLDER]);

                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_if_false_pos, after_consequence);

                match alternative {
                    Some(alt) => {
                        self.compile_block(alt)?;
                        if self.last_instruction_is(OpCode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                    None => {
                        self.emit(OpCode::Null, &[]);
                    }
                }

                let after_alternative = self.current_instructions().len();
                self.change_operand(jump_pos, after_alternative);
            }

            ExprKind::Function { parameters, body } => {
                self.enter_scope();

                for parameter in parameters {
                    self.symbols.define(parameter);
                }

                self.compile_block(body)?;

                if self.last_instruction_is(OpCode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(OpCode::Return) {
                    self.emit(OpCode::ReturnNull, &[]);
                }

                let (instructions, num_locals) = self.leave_scope();
                let index = self.add_constant(Value::Function(Rc::new(CompiledFunction {
                    instructions,
                    num_locals,
                })));
                self.emit(OpCode::Constant, &[index]);
            }

            ExprKind::Call { callee, arguments } => {
                self.compile_expression(callee)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(OpCode::Call, &[arguments.len()]);
            }

            ExprKind::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(OpCode::BuildArray, &[elements.len()]);
            }

            ExprKind::Hash(pairs) => {
                // Keys compile in a stable order so the constant pool and
                // inspect output do not depend on source order.
                let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());

                for (key, value) in sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(OpCode::BuildHash, &[pairs.len() * 2]);
            }

            ExprKind::Index { object, index } => {
                self.compile_expression(object)?;
                self.compile_expression(index)?;
                self.emit(OpCode::Index, &[]);
            }
        }

        Ok(())
    }

    // ===== Emission helpers =====

    fn emit(&mut self, op: OpCode, operands: &[usize]) -> usize {
        let instruction = make(op, operands);
        let scope = self.scope_mut();
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(&instruction);
        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        position
    }

    fn add_constant(&mut self, value: Value) -> usize {
        let index = self.constants.len();
        assert!(index < 65536, "too many constants");
        self.constants.push(value);
        index
    }

    fn load_symbol(&mut self, scope: SymbolScope, index: usize) {
        match scope {
            SymbolScope::Global => self.emit(OpCode::GetGlobal, &[index]),
            SymbolScope::Local => self.emit(OpCode::GetLocal, &[index]),
        };
    }

    fn current_instructions(&self) -> &[u8] {
        &self
            .scopes
            .last()
            .expect("scope stack never empty")
            .instructions
    }

    fn scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("scope stack never empty")
    }

    fn last_instruction_is(&self, op: OpCode) -> bool {
        self.scopes
            .last()
            .and_then(|s| s.last)
            .is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.scope_mut();
        if let Some(last) = scope.last {
            scope.instructions.truncate(last.position);
            scope.last = scope.previous;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.scope_mut();
        if let Some(last) = &mut scope.last {
            scope.instructions[last.position] = OpCode::Return as u8;
            last.opcode = OpCode::Return;
        }
    }

    /// Overwrite the operand of the instruction at `position` in place.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let scope = self.scope_mut();
        let op = OpCode::from_u8(scope.instructions[position]).expect("patching a valid opcode");
        let instruction = make(op, &[operand]);
        scope.instructions[position..position + instruction.len()].copy_from_slice(&instruction);
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbols.push_scope();
    }

    /// Close the innermost function scope, returning its instructions and
    /// the number of local slots it needs.
    fn leave_scope(&mut self) -> (Vec<u8>, usize) {
        let scope = self.scopes.pop().expect("scope stack never empty");
        let num_locals = self.symbols.pop_scope();
        (scope.instructions, num_locals)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
