//! Statement grammar: bodies, control flow and jump-offset accounting.
//!
//! Loop and branch bodies are assembled into temporary buffers first, so the
//! self-relative jump offsets around them can be computed from the buffer
//! lengths before everything is concatenated.

use crate::bytecode::{Code, Op};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};

use super::core::{ParseResult, Parser};

/// What ends the statement sequence currently being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Terminator {
    /// The top-level program runs to end of file.
    Eof,
    /// A braced body runs to its closing `}`.
    Brace,
}

impl Terminator {
    fn matches(self, kind: TokenKind) -> bool {
        match self {
            Terminator::Eof => kind == TokenKind::Eof,
            Terminator::Brace => kind == TokenKind::RightBrace,
        }
    }
}

impl Parser<'_> {
    /// Parse statements into `code` until the terminator. Statements are
    /// separated by end-of-statement tokens or ended by the terminator.
    pub(crate) fn body(&mut self, mut code: Code, end: Terminator) -> ParseResult<Code> {
        loop {
            let token = self.get();
            match token.kind {
                TokenKind::EndOfStatement => continue,
                TokenKind::If => self.if_statement(&mut code)?,
                TokenKind::For => self.for_statement(&mut code)?,
                TokenKind::While => self.while_statement(&mut code)?,
                TokenKind::Print => self.print_statement(&mut code, false)?,
                TokenKind::Println => self.print_statement(&mut code, true)?,
                TokenKind::Return => self.return_statement(&mut code, end)?,
                TokenKind::Dot | TokenKind::Identifier => {
                    self.assign_or_call_statement(&mut code, token)?
                }
                kind if end.matches(kind) => return Ok(code),
                _ => {
                    return Err(ParseError::unexpected(
                        "'if', 'for', 'while', 'return' or a name",
                        &token,
                    ))
                }
            }
            let separator = self.get();
            if end.matches(separator.kind) {
                return Ok(code);
            }
            if separator.kind != TokenKind::EndOfStatement {
                return Err(ParseError::unexpected("';' or a newline", &separator));
            }
        }
    }

    /// A `{ ... }` body. `prefix` seeds the buffer; function literals pass
    /// their parameter-binding ops here.
    pub(crate) fn block(&mut self, prefix: Code) -> ParseResult<Code> {
        self.expect(TokenKind::LeftBrace, "'{'")?;
        self.body(prefix, Terminator::Brace)
    }

    /// `if EXPR { ... } [else { ... }]`. The condition is followed by a
    /// `JumpIfFalse` over the then-body; with an else present, the then-body
    /// ends with a `Jump` over the else-body.
    fn if_statement(&mut self, code: &mut Code) -> ParseResult<()> {
        self.expression(code)?;
        let mut then_body = self.block(Code::new())?;
        if self.peek_kind(0) == TokenKind::Else {
            self.skip(1);
            let else_body = self.block(Code::new())?;
            then_body.push(Op::Jump(else_body.len() as i64 + 1));
            code.push(Op::JumpIfFalse(then_body.len() as i64 + 1));
            code.extend(then_body);
            code.extend(else_body);
        } else {
            code.push(Op::JumpIfFalse(then_body.len() as i64 + 1));
            code.extend(then_body);
        }
        Ok(())
    }

    /// `for INIT ; COND ; STEP { ... }`. INIT is empty when the first token
    /// is the `;`, STEP when the body brace follows directly.
    fn for_statement(&mut self, code: &mut Code) -> ParseResult<()> {
        if !self.at_semicolon() {
            let first = self.get();
            self.init_assignment(code, first)?;
        }
        self.expect_semicolon()?;
        let start = code.len() as i64;
        self.expression(code)?;
        self.expect_semicolon()?;
        let mut step = Code::new();
        if self.peek_kind(0) != TokenKind::LeftBrace {
            let first = self.get();
            self.init_assignment(&mut step, first)?;
        }
        let body = self.block(Code::new())?;
        code.push(Op::JumpIfFalse(body.len() as i64 + step.len() as i64 + 2));
        code.extend(body);
        code.extend(step);
        code.push(Op::Jump(start - code.len() as i64));
        Ok(())
    }

    /// `while EXPR { ... }`: a `for` with empty init and step.
    fn while_statement(&mut self, code: &mut Code) -> ParseResult<()> {
        let start = code.len() as i64;
        self.expression(code)?;
        let body = self.block(Code::new())?;
        code.push(Op::JumpIfFalse(body.len() as i64 + 2));
        code.extend(body);
        code.push(Op::Jump(start - code.len() as i64));
        Ok(())
    }

    /// `@print( ... )` / `@println( ... )` with the argument count as the
    /// opcode operand.
    fn print_statement(&mut self, code: &mut Code, newline: bool) -> ParseResult<()> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let argc = self.arguments(code)?;
        code.push(if newline {
            Op::Println(argc)
        } else {
            Op::Print(argc)
        });
        Ok(())
    }

    /// `return [EXPR]`. A bare return ends the frame void.
    fn return_statement(&mut self, code: &mut Code, end: Terminator) -> ParseResult<()> {
        let next = self.peek_kind(0);
        if next == TokenKind::EndOfStatement || end.matches(next) {
            code.push(Op::Return(false));
        } else {
            self.expression(code)?;
            code.push(Op::Return(true));
        }
        Ok(())
    }

    /// A statement starting with a name reference: either an assignment or
    /// a call whose result is discarded.
    fn assign_or_call_statement(&mut self, code: &mut Code, first: Token) -> ParseResult<()> {
        self.name_reference(code, first)?;
        let next = self.get();
        match next.kind {
            TokenKind::Equal => self.assignment(code),
            TokenKind::LeftParen => {
                code.push(Op::LoadDynamic);
                let argc = self.arguments(code)?;
                code.push(Op::Call(argc));
                code.push(Op::Pop);
                Ok(())
            }
            _ => Err(ParseError::unexpected("'=' or '('", &next)),
        }
    }

    /// The single-assignment form allowed in `for` init and step positions.
    fn init_assignment(&mut self, code: &mut Code, first: Token) -> ParseResult<()> {
        self.name_reference(code, first)?;
        self.expect(TokenKind::Equal, "'='")?;
        self.assignment(code)
    }

    fn at_semicolon(&mut self) -> bool {
        let token = self.peek(0);
        token.kind == TokenKind::EndOfStatement && token.text == ";"
    }

    /// `for` headers require literal semicolons; a newline does not count.
    fn expect_semicolon(&mut self) -> ParseResult<()> {
        let token = self.get();
        if token.kind == TokenKind::EndOfStatement && token.text == ";" {
            Ok(())
        } else {
            Err(ParseError::unexpected("';'", &token))
        }
    }
}
