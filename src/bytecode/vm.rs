//! Stack-based virtual machine for executing bytecode.

use std::rc::Rc;

use crate::bytecode::compiler::Bytecode;
use crate::bytecode::instruction::{read_u16, OpCode};
use crate::bytecode::value::{CompiledFunction, HashEntries, HashPair, Value};
use crate::error::RuntimeError;

/// Maximum number of values on the stack.
pub const STACK_SIZE: usize = 2048;
/// Capacity of the globals vector.
pub const GLOBALS_SIZE: usize = 65536;
/// Maximum number of active call frames.
pub const MAX_FRAMES: usize = 1024;

/// Result type for VM operations.
pub type VMResult<T> = Result<T, RuntimeError>;

/// A call frame: one active function invocation.
///
/// `base_pointer` is the stack index of the frame's local slot zero; the
/// frame lives from the Call that created it to the Return that pops it.
#[derive(Debug)]
struct Frame {
    func: Rc<CompiledFunction>,
    ip: usize,
    base_pointer: usize,
}

impl Frame {
    fn new(func: Rc<CompiledFunction>, base_pointer: usize) -> Self {
        Self {
            func,
            ip: 0,
            base_pointer,
        }
    }

    fn instructions(&self) -> &[u8] {
        &self.func.instructions
    }
}

/// The bytecode virtual machine.
///
/// Constants are borrowed from the compilation result; the value stack and
/// globals vector are fixed-capacity and indexed through `sp`, so the most
/// recently popped value stays readable at `stack[sp]`.
pub struct VM<'a> {
    constants: &'a [Value],
    stack: Vec<Value>,
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl<'a> VM<'a> {
    /// Create a VM for a compiled program with a fresh globals vector.
    pub fn new(bytecode: &'a Bytecode) -> Self {
        Self::with_globals_store(bytecode, vec![Value::Null; GLOBALS_SIZE])
    }

    /// Create a VM that reuses a caller-supplied globals vector, so a REPL
    /// can carry state across runs. Recover it with [`VM::into_globals`].
    pub fn with_globals_store(bytecode: &'a Bytecode, globals: Vec<Value>) -> Self {
        let main = Rc::new(CompiledFunction {
            instructions: bytecode.instructions.clone(),
            num_locals: 0,
        });

        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(main, 0));

        Self {
            constants: &bytecode.constants,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames,
        }
    }

    /// Take back the globals vector after a run.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The value most recently popped off the stack. After a successful
    /// run this is the final expression's value.
    pub fn last_popped(&self) -> &Value {
        &self.stack[self.sp]
    }

    /// Execute until the main function's instructions are exhausted or a
    /// runtime error is raised.
    pub fn run(&mut self) -> VMResult<()> {
        while self.current_frame().ip < self.current_frame().instructions().len() {
            let op_byte = self.read_u8();
            let op = OpCode::from_u8(op_byte).ok_or(RuntimeError::InvalidOpcode(op_byte))?;

            match op {
                OpCode::Constant => {
                    let index = self.read_operand_u16();
                    let value = self
                        .constants
                        .get(index as usize)
                        .ok_or(RuntimeError::InvalidConstant(index))?
                        .clone();
                    self.push(value)?;
                }

                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::Add | OpCode::Subtract | OpCode::Multiply | OpCode::Divide => {
                    self.execute_binary_op(op)?;
                }

                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Null => self.push(Value::Null)?,

                OpCode::Equal | OpCode::NotEqual | OpCode::Greater => {
                    self.execute_comparison(op)?;
                }

                OpCode::Not => {
                    let operand = self.pop()?;
                    self.push(Value::Bool(!operand.is_truthy()))?;
                }

                OpCode::Negate => {
                    let operand = self.pop()?;
                    match operand {
                        Value::Int(n) => self.push(Value::Int(n.wrapping_neg()))?,
                        other => {
                            return Err(RuntimeError::UnsupportedNegation(other.type_name()))
                        }
                    }
                }

                OpCode::Jump => {
                    let target = self.read_operand_u16() as usize;
                    self.current_frame_mut().ip = target;
                }

                OpCode::JumpIfFalse => {
                    let target = self.read_operand_u16() as usize;
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target;
                    }
                }

                OpCode::SetGlobal => {
                    let slot = self.read_operand_u16() as usize;
                    let value = self.pop()?;
                    self.globals[slot] = value;
                }

                OpCode::GetGlobal => {
                    let slot = self.read_operand_u16() as usize;
                    let value = self.globals[slot].clone();
                    self.push(value)?;
                }

                OpCode::SetLocal => {
                    let slot = self.read_u8() as usize;
                    let base = self.current_frame().base_pointer;
                    let value = self.pop()?;
                    self.stack[base + slot] = value;
                }

                OpCode::GetLocal => {
                    let slot = self.read_u8() as usize;
                    let base = self.current_frame().base_pointer;
                    let value = self.stack[base + slot].clone();
                    self.push(value)?;
                }

                OpCode::BuildArray => {
                    let count = self.read_operand_u16() as usize;
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Value::Array(Rc::new(elements)))?;
                }

                OpCode::BuildHash => {
                    let count = self.read_operand_u16() as usize;
                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }

                OpCode::Index => {
                    let index = self.pop()?;
                    let object = self.pop()?;
                    self.execute_index(object, index)?;
                }

                OpCode::Call => {
                    let argc = self.read_u8() as usize;
                    self.call_function(argc)?;
                }

                OpCode::Return => {
                    let value = self.pop()?;
                    if self.return_from_frame(value)? {
                        return Ok(());
                    }
                }

                OpCode::ReturnNull => {
                    if self.return_from_frame(Value::Null)? {
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    // ===== Operators =====

    fn execute_binary_op(&mut self, op: OpCode) -> VMResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => {
                let result = match op {
                    OpCode::Add => l.wrapping_add(*r),
                    OpCode::Subtract => l.wrapping_sub(*r),
                    OpCode::Multiply => l.wrapping_mul(*r),
                    OpCode::Divide => {
                        if *r == 0 {
                            return Err(RuntimeError::DivisionByZero);
                        }
                        l.wrapping_div(*r)
                    }
                    _ => unreachable!("dispatched as binary op"),
                };
                self.push(Value::Int(result))
            }

            (Value::String(l), Value::String(r)) => {
                if op != OpCode::Add {
                    return Err(RuntimeError::UnknownStringOperator(op.name()));
                }
                self.push(Value::String(Rc::new(format!("{}{}", l, r))))
            }

            _ => Err(RuntimeError::UnsupportedBinaryTypes {
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn execute_comparison(&mut self, op: OpCode) -> VMResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        if let (Value::Int(l), Value::Int(r)) = (&left, &right) {
            let result = match op {
                OpCode::Equal => l == r,
                OpCode::NotEqual => l != r,
                OpCode::Greater => l > r,
                _ => unreachable!("dispatched as comparison"),
            };
            return self.push(Value::Bool(result));
        }

        match op {
            OpCode::Equal => self.push(Value::Bool(left == right)),
            OpCode::NotEqual => self.push(Value::Bool(left != right)),
            _ => Err(RuntimeError::UnknownComparison {
                op: op.name(),
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    // ===== Collections =====

    fn build_hash(&self, start: usize, end: usize) -> VMResult<Value> {
        let mut entries =
            HashEntries::with_capacity_and_hasher((end - start) / 2, ahash::RandomState::new());

        for i in (start..end).step_by(2) {
            let key = self.stack[i].clone();
            let value = self.stack[i + 1].clone();

            let hash_key = key
                .hash_key()
                .ok_or(RuntimeError::UnusableHashKey(key.type_name()))?;
            entries.insert(hash_key, HashPair { key, value });
        }

        Ok(Value::Hash(Rc::new(entries)))
    }

    fn execute_index(&mut self, object: Value, index: Value) -> VMResult<()> {
        match (&object, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                // Out of range is null, not an error.
                let value = if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                };
                self.push(value)
            }

            (Value::Hash(entries), _) => {
                let hash_key = index
                    .hash_key()
                    .ok_or(RuntimeError::UnusableHashKey(index.type_name()))?;
                let value = entries
                    .get(&hash_key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(Value::Null);
                self.push(value)
            }

            _ => Err(RuntimeError::IndexUnsupported(object.type_name())),
        }
    }

    // ===== Calls and frames =====

    fn call_function(&mut self, argc: usize) -> VMResult<()> {
        let callee = self.stack[self.sp - 1 - argc].clone();
        let Value::Function(func) = callee else {
            return Err(RuntimeError::CallNonFunction);
        };

        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }

        // Arguments already sit on the stack, becoming locals 0..argc-1.
        let base_pointer = self.sp - argc;
        let new_sp = base_pointer + func.num_locals;
        if new_sp > STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }

        self.frames.push(Frame::new(func, base_pointer));
        self.sp = new_sp;

        Ok(())
    }

    /// Pop the current frame and push `value` for the caller. Returns true
    /// when the main frame itself returned, ending the run.
    fn return_from_frame(&mut self, value: Value) -> VMResult<bool> {
        let frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow)?;

        if self.frames.is_empty() {
            // Return at the top level: nothing below to clean up.
            self.sp = 0;
            self.push(value)?;
            return Ok(true);
        }

        // Drop the callee's locals, arguments, and the function itself.
        self.sp = frame.base_pointer - 1;
        self.push(value)?;
        Ok(false)
    }

    // ===== Fetch helpers =====

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no call frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no call frame")
    }

    fn read_u8(&mut self) -> u8 {
        let frame = self.current_frame_mut();
        let byte = frame.func.instructions[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_operand_u16(&mut self) -> u16 {
        let frame = self.current_frame_mut();
        let value = read_u16(&frame.func.instructions[frame.ip..]);
        frame.ip += 2;
        value
    }

    // ===== Stack discipline =====

    fn push(&mut self, value: Value) -> VMResult<()> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    /// Pop the top of stack. The slot keeps its value so `last_popped`
    /// can read it back.
    fn pop(&mut self) -> VMResult<Value> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::bytecode::compiler::Compiler;
    use crate::lexer::Scanner;
    use crate::parser::Parser;

    fn run(source: &str) -> VMResult<Value> {
        let tokens = Scanner::new(source).scan_tokens().expect("lexer error");
        let program = Parser::new(tokens).parse().expect("parse error");
        let bytecode = Compiler::new()
            .compile(&program)
            .expect("compile error");

        let mut vm = VM::new(&bytecode);
        vm.run()?;
        Ok(vm.last_popped().clone())
    }

    fn run_ok(source: &str) -> Value {
        run(source).expect("vm error")
    }

    #[test]
    fn test_integer_arithmetic() {
        let tests = [
            ("1", 1),
            ("2", 2),
            ("1 + 2", 3),
            ("0 - 4", -4),
            ("3 * 2", 6),
            ("10 / 2", 5),
            ("12 / 4 * 3 + 10 - 5", 14),
            ("2 + 2 + 2 + 2 - 8", 0),
            ("2 * 2 * 2 * 2 * 2", 32),
            ("4 * 2 + 10", 18),
            ("4 + 2 * 10", 24),
            ("3 * (2 + 4)", 18),
            ("1 + 2 * 3", 7),
            ("-5", -5),
            ("-10 + 100 + -50", 40),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_boolean_expressions() {
        let tests = [
            ("true", true),
            ("false", false),
            ("1 < 2", true),
            ("1 > 2", false),
            ("1 < 1", false),
            ("1 > 1", false),
            ("1 == 1", true),
            ("1 != 1", false),
            ("1 == 2", false),
            ("1 != 2", true),
            ("true == true", true),
            ("true == false", false),
            ("false == true", false),
            ("true != false", true),
            ("false != true", true),
            ("(1 < 2) == true", true),
            ("(1 < 2) == false", false),
            ("(1 > 2) == true", false),
            ("(1 > 2) == false", true),
            ("null == null", true),
            ("1 == true", false),
            ("!true", false),
            ("!false", true),
            ("!5", false),
            ("!null", true),
            ("!!true", true),
            ("!!false", false),
            ("!!5", true),
            ("!(if false { 5; })", true),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Bool(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_string_equality_is_by_content() {
        assert_eq!(run_ok(r#""a" + "b" == "ab""#), Value::Bool(true));
        assert_eq!(run_ok(r#""a" != "b""#), Value::Bool(true));
    }

    #[test]
    fn test_conditionals() {
        let tests = [
            ("if true { 10 }", Value::Int(10)),
            ("if true { 10 } else { 20 }", Value::Int(10)),
            ("if false { 10 } else { 20 }", Value::Int(20)),
            ("if 1 { 10 }", Value::Int(10)),
            ("if 1 < 2 { 10 }", Value::Int(10)),
            ("if (1 < 2) { 10 } else { 20 }", Value::Int(10)),
            ("if (1 > 2) { 10 } else { 20 }", Value::Int(20)),
            ("if (1 > 2) { 10 }", Value::Null),
            ("if false { 10 }", Value::Null),
            ("if if false { 10 } { 10 } else { 20 }", Value::Int(20)),
            ("if 0 { 10 }", Value::Int(10)),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_global_let_statements() {
        let tests = [
            ("let one = 1; one", 1),
            ("let one = 1; let two = 2; one + two", 3),
            ("let one = 1; let two = one + one; one + two", 3),
            ("let a = 1; let b = 2; a + b", 3),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_string_expressions() {
        let tests = [
            (r#""foobar""#, "foobar"),
            (r#""foo" + "bar""#, "foobar"),
            (r#""foo" + "bar" + "baz""#, "foobarbaz"),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input).to_string(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_array_literals() {
        let tests = [
            ("[]", "[]"),
            ("[1, 2, 3]", "[1, 2, 3]"),
            ("[1 + 2, 3 - 4, 5 * 6]", "[3, -1, 30]"),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input).to_string(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_hash_literals() {
        let tests = [
            ("{}", "{}"),
            ("{1: 2, 3: 4}", "{1: 2, 3: 4}"),
            ("{1 + 1: 2 * 2, 3 + 3: 4 * 4}", "{2: 4, 6: 16}"),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input).to_string(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_index_expressions() {
        let tests = [
            ("[1, 2, 3][1]", Value::Int(2)),
            ("[1, 2, 3][0 + 2]", Value::Int(3)),
            ("[1, 2, 3][1 + 1]", Value::Int(3)),
            ("[[1, 1, 1]][0][0]", Value::Int(1)),
            ("[][0]", Value::Null),
            ("[1, 2, 3][99]", Value::Null),
            ("[1][-1]", Value::Null),
            ("{1: 1, 2: 2}[1]", Value::Int(1)),
            ("{1: 1, 2: 2}[2]", Value::Int(2)),
            ("{1: 1}[0]", Value::Null),
            ("{}[0]", Value::Null),
            (r#"{"k": 42}["k"]"#, Value::Int(42)),
            (r#"{true: 1, false: 0}[true]"#, Value::Int(1)),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_calling_functions_without_arguments() {
        let tests = [
            ("let fivePlusTen = fn() { 5 + 10 }; fivePlusTen()", 15),
            ("let one = fn() { 1 }; let two = fn() { 2 }; one() + two()", 3),
            ("let a = fn() { 1 }; let b = fn() { a() + 1 }; b()", 2),
            ("fn() { 24 }()", 24),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_functions_with_return_statements() {
        let tests = [
            ("let earlyExit = fn() { return 99; 100 }; earlyExit()", 99),
            ("let earlyExit = fn() { return 99; return 100 }; earlyExit()", 99),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_functions_without_return_value() {
        assert_eq!(run_ok("let noReturn = fn() { }; noReturn()"), Value::Null);
    }

    #[test]
    fn test_calling_functions_with_bindings() {
        let tests = [
            ("let one = fn() { let one = 1; one }; one()", 1),
            (
                "let oneAndTwo = fn() { let one = 1; let two = 2; one + two }; oneAndTwo()",
                3,
            ),
            (
                "let oneAndTwo = fn() { let one = 1; let two = 2; one + two };
                 let threeAndFour = fn() { let three = 3; let four = 4; three + four };
                 oneAndTwo() + threeAndFour()",
                10,
            ),
            (
                "let firstFoobar = fn() { let foobar = 50; foobar };
                 let secondFoobar = fn() { let foobar = 100; foobar };
                 firstFoobar() + secondFoobar()",
                150,
            ),
            (
                "let globalSeed = 50;
                 let minusOne = fn() { let num = 1; globalSeed - num };
                 let minusTwo = fn() { let num = 2; globalSeed - num };
                 minusOne() + minusTwo()",
                97,
            ),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_calling_functions_with_arguments() {
        let tests = [
            ("let identity = fn(a) { a }; identity(4)", 4),
            ("let sum = fn(a, b) { a + b }; sum(1, 2)", 3),
            ("let sum = fn(a, b) { let c = a + b; c }; sum(1, 2)", 3),
            (
                "let sum = fn(a, b) { let c = a + b; c }; sum(1, 2) + sum(3, 4)",
                10,
            ),
            (
                "let sum = fn(a, b) { let c = a + b; c };
                 let outer = fn() { sum(1, 2) + sum(3, 4) };
                 outer()",
                10,
            ),
            (
                "let globalNum = 10;
                 let sum = fn(a, b) { let c = a + b; c + globalNum };
                 let outer = fn() { sum(1, 2) + sum(3, 4) + globalNum };
                 outer() + globalNum",
                50,
            ),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_first_class_functions() {
        let tests = [
            (
                "let returnsOne = fn() { 1 };
                 let returnsOneReturner = fn() { returnsOne };
                 returnsOneReturner()()",
                1,
            ),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_recursive_functions() {
        let tests = [
            (
                "let countDown = fn(x) { if x == 0 { 0 } else { countDown(x - 1) } };
                 countDown(3)",
                0,
            ),
            (
                "let fib = fn(n) { if n < 2 { n } else { fib(n - 1) + fib(n - 2) } };
                 fib(10)",
                55,
            ),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input), Value::Int(expected), "input: {}", input);
        }
    }

    #[test]
    fn test_runtime_errors() {
        let tests = [
            (
                "1 + true",
                RuntimeError::UnsupportedBinaryTypes {
                    left: "INTEGER",
                    right: "BOOLEAN",
                },
            ),
            (
                "true + false",
                RuntimeError::UnsupportedBinaryTypes {
                    left: "BOOLEAN",
                    right: "BOOLEAN",
                },
            ),
            (r#""a" - "b""#, RuntimeError::UnknownStringOperator("Subtract")),
            ("-true", RuntimeError::UnsupportedNegation("BOOLEAN")),
            ("{[1]: 2}", RuntimeError::UnusableHashKey("ARRAY")),
            ("{1: 2}[[1]]", RuntimeError::UnusableHashKey("ARRAY")),
            ("5[0]", RuntimeError::IndexUnsupported("INTEGER")),
            (r#""str"[0]"#, RuntimeError::IndexUnsupported("STRING")),
            ("let x = 1; x()", RuntimeError::CallNonFunction),
            (
                "true > false",
                RuntimeError::UnknownComparison {
                    op: "Greater",
                    left: "BOOLEAN",
                    right: "BOOLEAN",
                },
            ),
            ("1 / 0", RuntimeError::DivisionByZero),
        ];

        for (input, expected) in tests {
            assert_eq!(run(input).unwrap_err(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            run("1 + true").unwrap_err().to_string(),
            "unsupported types for binary operation: INTEGER BOOLEAN"
        );
        assert_eq!(
            run("true > false").unwrap_err().to_string(),
            "unknown operator: Greater (BOOLEAN BOOLEAN)"
        );
        assert_eq!(
            run("let x = 1; x()").unwrap_err().to_string(),
            "calling non-function"
        );
    }

    #[test]
    fn test_unbounded_recursion_overflows() {
        let err = run("let loop = fn() { loop() }; loop()").unwrap_err();
        assert_eq!(err, RuntimeError::StackOverflow);
    }

    #[test]
    fn test_spec_scenarios() {
        let tests = [
            ("1 + 2 * 3", "7"),
            ("let a = 1; let b = 2; a + b", "3"),
            ("if (1 < 2) { 10 } else { 20 }", "10"),
            ("if (1 > 2) { 10 }", "null"),
            (r#""foo" + "bar""#, "foobar"),
            ("[1, 2, 3][1 + 1]", "3"),
            (r#"{"k": 42}["k"]"#, "42"),
            (
                "let fib = fn(n){ if n < 2 { n } else { fib(n-1) + fib(n-2) } }; fib(10)",
                "55",
            ),
            ("!!5", "true"),
            ("[1][-1]", "null"),
        ];

        for (input, expected) in tests {
            assert_eq!(run_ok(input).to_string(), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_stack_is_balanced_after_run() {
        let tokens = Scanner::new("let a = 1; a + 2").scan_tokens().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let bytecode = Compiler::new().compile(&program).unwrap();

        let mut vm = VM::new(&bytecode);
        vm.run().unwrap();
        assert_eq!(vm.sp, 0);
        assert_eq!(vm.last_popped(), &Value::Int(3));
    }

    #[test]
    fn test_globals_survive_across_runs() {
        let mut compiler = Compiler::new();
        let mut globals = vec![Value::Null; GLOBALS_SIZE];

        let parse = |source: &str| {
            let tokens = Scanner::new(source).scan_tokens().unwrap();
            Parser::new(tokens).parse().unwrap()
        };

        let bytecode = compiler.compile(&parse("let a = 40;")).unwrap();
        let mut vm = VM::with_globals_store(&bytecode, globals);
        vm.run().unwrap();
        globals = vm.into_globals();

        let bytecode = compiler.compile(&parse("a + 2")).unwrap();
        let mut vm = VM::with_globals_store(&bytecode, globals);
        vm.run().unwrap();
        assert_eq!(vm.last_popped(), &Value::Int(42));
    }
}
