//! Recursive-descent parser emitting bytecode with self-relative jumps.

mod core;
mod expressions;
mod statements;

pub use self::core::{ParseResult, Parser};

use crate::bytecode::Code;
use crate::error::ParseError;

/// Parse a complete program to bytecode.
pub fn parse(source: &str) -> Result<Code, ParseError> {
    Parser::new(source).parse()
}
