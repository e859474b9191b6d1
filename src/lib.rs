//! YAIL: Yet Another Interpreted Language.
//!
//! A tiny dynamically-typed scripting language with first-class functions,
//! parent-frame name access through a dot-prefix escape, indexed variables
//! and console I/O. The pipeline:
//!
//! ```text
//! source text -> Lexer -> token stream -> Parser -> Bytecode -> VM -> stdout/stdin
//! ```
//!
//! The parser emits flat bytecode with self-relative jumps; the VM executes
//! it against an operand stack and a per-frame environment. There is no
//! recovery: the first parse or runtime error ends the run.

pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod vm;

use std::io::{BufRead, Write};
use std::rc::Rc;

pub use error::YailError;

/// Parse and execute a program against the given byte streams.
pub fn interpret<R: BufRead, W: Write>(source: &str, input: R, output: W) -> Result<(), YailError> {
    let code = parser::parse(source)?;
    let mut vm = vm::Vm::new(input, output);
    vm.run(Rc::new(code))?;
    Ok(())
}

/// As [`interpret`], with a fixed RNG seed for reproducible runs.
pub fn interpret_with_seed<R: BufRead, W: Write>(
    source: &str,
    input: R,
    output: W,
    seed: u64,
) -> Result<(), YailError> {
    let code = parser::parse(source)?;
    let mut vm = vm::Vm::with_seed(input, output, seed);
    vm.run(Rc::new(code))?;
    Ok(())
}

/// Parse a program to bytecode without executing it.
pub fn parse(source: &str) -> Result<bytecode::Code, YailError> {
    Ok(parser::parse(source)?)
}

/// Disassemble compiled bytecode to a string.
pub fn disassemble(code: &bytecode::Code) -> String {
    bytecode::disassemble(code)
}
