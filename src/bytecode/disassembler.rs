//! Bytecode disassembler for debug output.

use super::opcode::{Code, Op};

/// Disassemble a compiled program to a human-readable string. Function
/// bodies are printed inline, indented under their `PUSH_FUNCTION`.
pub fn disassemble(code: &Code) -> String {
    let mut out = String::new();
    write_code(code, 0, &mut out);
    out
}

fn write_code(code: &Code, depth: usize, out: &mut String) {
    for (offset, op) in code.iter().enumerate() {
        out.push_str(&format!("{:indent$}{:04} ", "", offset, indent = depth * 4));
        write_op(op, depth, out);
        out.push('\n');
    }
}

fn write_op(op: &Op, depth: usize, out: &mut String) {
    match op {
        Op::PushInt(n) => out.push_str(&format!("PUSH_INT      {}", n)),
        Op::PushFloat(n) => out.push_str(&format!("PUSH_FLOAT    {}", n)),
        Op::PushBool(b) => out.push_str(&format!("PUSH_BOOL     {}", b)),
        Op::PushString(s) => out.push_str(&format!("PUSH_STRING   {:?}", s)),
        Op::PushFunction(body) => {
            out.push_str("PUSH_FUNCTION\n");
            write_code(body, depth + 1, out);
            // Drop the trailing newline; the caller adds one.
            out.pop();
        }
        Op::LoadName(name) => out.push_str(&format!("LOAD_NAME     {}", name)),
        Op::StoreName(name) => out.push_str(&format!("STORE_NAME    {}", name)),
        Op::LoadDynamic => out.push_str("LOAD_DYNAMIC"),
        Op::StoreDynamic => out.push_str("STORE_DYNAMIC"),
        Op::Add => out.push_str("ADD"),
        Op::Sub => out.push_str("SUB"),
        Op::Mul => out.push_str("MUL"),
        Op::Div => out.push_str("DIV"),
        Op::Mod => out.push_str("MOD"),
        Op::Neg => out.push_str("NEG"),
        Op::Or => out.push_str("OR"),
        Op::And => out.push_str("AND"),
        Op::Not => out.push_str("NOT"),
        Op::Eq => out.push_str("EQ"),
        Op::Neq => out.push_str("NEQ"),
        Op::Less => out.push_str("LESS"),
        Op::Greater => out.push_str("GREATER"),
        Op::Leq => out.push_str("LEQ"),
        Op::Geq => out.push_str("GEQ"),
        Op::Jump(offset) => out.push_str(&format!("JUMP          {}", offset)),
        Op::JumpIfFalse(offset) => out.push_str(&format!("JUMP_IF_FALSE {}", offset)),
        Op::Call(argc) => out.push_str(&format!("CALL          {}", argc)),
        Op::Return(with_value) => {
            out.push_str(&format!("RETURN        {}", usize::from(*with_value)))
        }
        Op::Pop => out.push_str("POP"),
        Op::ReadInt => out.push_str("READ_INT"),
        Op::ReadFloat => out.push_str("READ_FLOAT"),
        Op::ReadString => out.push_str("READ_STRING"),
        Op::ReadLine => out.push_str("READ_LINE"),
        Op::ReadChar => out.push_str("READ_CHAR"),
        Op::Print(n) => out.push_str(&format!("PRINT         {}", n)),
        Op::Println(n) => out.push_str(&format!("PRINTLN       {}", n)),
        Op::Rnd => out.push_str("RND"),
    }
}
