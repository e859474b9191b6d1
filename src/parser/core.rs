//! Core parser struct and token-stream helpers.

use crate::bytecode::Code;
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind, TokenStream};

use super::statements::Terminator;

pub type ParseResult<T> = Result<T, ParseError>;

/// The YAIL parser. Consumes the token stream once, front to back, peeking
/// at most four tokens ahead (for the function-literal split after `=`).
pub struct Parser<'a> {
    tokens: TokenStream<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            tokens: TokenStream::new(source),
        }
    }

    /// Parse a complete program: a statement sequence terminated by EOF.
    pub fn parse(mut self) -> ParseResult<Code> {
        self.body(Code::new(), Terminator::Eof)
    }

    // ===== Token manipulation =====

    pub(crate) fn get(&mut self) -> Token {
        self.tokens.next()
    }

    pub(crate) fn peek(&mut self, n: usize) -> &Token {
        self.tokens.peek(n)
    }

    pub(crate) fn peek_kind(&mut self, n: usize) -> TokenKind {
        self.tokens.peek(n).kind
    }

    pub(crate) fn skip(&mut self, n: usize) {
        self.tokens.skip(n);
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        let token = self.get();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::unexpected(expected, &token))
        }
    }
}
