//! Bytecode disassembler for debugging.

use std::fmt::Write;

use crate::bytecode::compiler::Bytecode;
use crate::bytecode::instruction::{read_operand, OpCode};
use crate::bytecode::value::Value;

/// Disassemble a compiled program: the main instruction buffer first, then
/// every function in the constant pool.
pub fn disassemble(bytecode: &Bytecode) -> String {
    let mut output = String::new();

    writeln!(&mut output, "== main ==").unwrap();
    disassemble_code(&bytecode.instructions, &bytecode.constants, &mut output);

    for (index, constant) in bytecode.constants.iter().enumerate() {
        if let Value::Function(func) = constant {
            writeln!(&mut output).unwrap();
            writeln!(
                &mut output,
                "== fn {} (locals: {}) ==",
                index, func.num_locals
            )
            .unwrap();
            disassemble_code(&func.instructions, &bytecode.constants, &mut output);
        }
    }

    output
}

/// Disassemble one instruction buffer into human-readable lines.
pub fn disassemble_code(code: &[u8], constants: &[Value], output: &mut String) {
    let mut offset = 0;

    while offset < code.len() {
        offset = disassemble_instruction(code, constants, offset, output);
    }
}

/// Disassemble the instruction at `offset`; returns the next offset.
pub fn disassemble_instruction(
    code: &[u8],
    constants: &[Value],
    offset: usize,
    output: &mut String,
) -> usize {
    write!(output, "{:04} ", offset).unwrap();

    let byte = code[offset];
    let Some(op) = OpCode::from_u8(byte) else {
        writeln!(output, "unknown opcode {}", byte).unwrap();
        return offset + 1;
    };

    let (operand, width) = read_operand(op, &code[offset + 1..]);

    match op {
        OpCode::Constant => {
            let annotation = constants
                .get(operand)
                .map(constant_str)
                .unwrap_or_else(|| format!("?{}", operand));
            writeln!(output, "{} {} ({})", op.name(), operand, annotation).unwrap();
        }
        _ if width > 0 => {
            writeln!(output, "{} {}", op.name(), operand).unwrap();
        }
        _ => {
            writeln!(output, "{}", op.name()).unwrap();
        }
    }

    offset + 1 + width
}

/// Render a constant for disassembly annotations.
fn constant_str(constant: &Value) -> String {
    match constant {
        Value::String(s) => {
            if s.len() > 20 {
                format!("\"{}...\"", &s[..20])
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Function(func) => format!("<fn locals: {}>", func.num_locals),
        other => other.to_string(),
    }
}
