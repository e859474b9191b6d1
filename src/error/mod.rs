//! Error types for parsing and execution.

use thiserror::Error;

use crate::lexer::Token;

/// Parser errors. The first one aborts the pipeline; there is no recovery.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("expected {expected}, got {found} on line {line}")]
    UnexpectedToken {
        expected: String,
        found: String,
        line: usize,
    },
}

impl ParseError {
    pub fn unexpected(expected: impl Into<String>, got: &Token) -> Self {
        Self::UnexpectedToken {
            expected: expected.into(),
            found: got.describe(),
            line: got.line,
        }
    }
}

/// Runtime errors. The first one terminates the program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("too many dots in variable name '{0}'")]
    DotOverflow(String),

    #[error("variable name is empty")]
    EmptyName,

    #[error("cannot call a {0} value")]
    NotCallable(&'static str),

    #[error("type error: {message}")]
    Type { message: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("jump target out of range ({0})")]
    JumpOutOfRange(i64),

    #[error("read failed: {message}")]
    Read { message: String },

    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    pub fn undefined_variable(name: impl Into<String>) -> Self {
        Self::UndefinedVariable(name.into())
    }
}

/// A unified error type for both pipeline stages.
#[derive(Debug, Error)]
pub enum YailError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
