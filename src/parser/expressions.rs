//! Expression grammar: the precedence ladder, primaries, name references,
//! calls and the assignment right-hand side.

use std::rc::Rc;

use crate::bytecode::{Code, Op};
use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};

use super::core::{ParseResult, Parser};

/// Left-associative binary operators, lowest precedence first.
const BINARY_LEVELS: &[&[TokenKind]] = &[
    &[TokenKind::Or],
    &[TokenKind::And],
    &[TokenKind::EqualEqual, TokenKind::BangEqual],
    &[
        TokenKind::Less,
        TokenKind::Greater,
        TokenKind::LessEqual,
        TokenKind::GreaterEqual,
    ],
    &[TokenKind::Plus, TokenKind::Minus],
    &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
];

fn binary_op(kind: TokenKind) -> Op {
    match kind {
        TokenKind::Or => Op::Or,
        TokenKind::And => Op::And,
        TokenKind::EqualEqual => Op::Eq,
        TokenKind::BangEqual => Op::Neq,
        TokenKind::Less => Op::Less,
        TokenKind::Greater => Op::Greater,
        TokenKind::LessEqual => Op::Leq,
        TokenKind::GreaterEqual => Op::Geq,
        TokenKind::Plus => Op::Add,
        TokenKind::Minus => Op::Sub,
        TokenKind::Star => Op::Mul,
        TokenKind::Slash => Op::Div,
        TokenKind::Percent => Op::Mod,
        _ => unreachable!("not a binary operator"),
    }
}

impl Parser<'_> {
    pub(crate) fn expression(&mut self, code: &mut Code) -> ParseResult<()> {
        self.binary(code, 0)
    }

    /// One rung of the ladder: parse the tighter level, then fold operands
    /// left to right while operators of this level follow.
    fn binary(&mut self, code: &mut Code, level: usize) -> ParseResult<()> {
        let Some(&operators) = BINARY_LEVELS.get(level) else {
            return self.primary(code);
        };
        self.binary(code, level + 1)?;
        'fold: loop {
            let kind = self.peek_kind(0);
            for &operator in operators {
                if kind == operator {
                    self.skip(1);
                    self.binary(code, level + 1)?;
                    code.push(binary_op(operator));
                    continue 'fold;
                }
            }
            return Ok(());
        }
    }

    fn primary(&mut self, code: &mut Code) -> ParseResult<()> {
        let token = self.get();
        match token.kind {
            TokenKind::Minus => {
                self.primary(code)?;
                code.push(Op::Neg);
            }
            TokenKind::Bang => {
                self.primary(code)?;
                code.push(Op::Not);
            }
            TokenKind::LeftParen => {
                self.expression(code)?;
                self.expect(TokenKind::RightParen, "')'")?;
            }
            TokenKind::IntLiteral => {
                let value = token
                    .text
                    .parse::<i64>()
                    .map_err(|_| ParseError::unexpected("an integer", &token))?;
                code.push(Op::PushInt(value));
            }
            TokenKind::FloatLiteral => {
                let value = token
                    .text
                    .parse::<f64>()
                    .map_err(|_| ParseError::unexpected("a float", &token))?;
                code.push(Op::PushFloat(value));
            }
            TokenKind::BoolLiteral => {
                code.push(Op::PushBool(token.text == "true"));
            }
            TokenKind::StringLiteral => {
                code.push(Op::PushString(unescape(&token)?));
            }
            TokenKind::ReadInt => code.push(Op::ReadInt),
            TokenKind::ReadFloat => code.push(Op::ReadFloat),
            TokenKind::ReadString => code.push(Op::ReadString),
            TokenKind::ReadLine => code.push(Op::ReadLine),
            TokenKind::ReadChar => code.push(Op::ReadChar),
            TokenKind::Rnd => code.push(Op::Rnd),
            TokenKind::Dot | TokenKind::Identifier => {
                self.name_reference(code, token)?;
                code.push(Op::LoadDynamic);
                if self.peek_kind(0) == TokenKind::LeftParen {
                    self.skip(1);
                    let argc = self.arguments(code)?;
                    code.push(Op::Call(argc));
                }
            }
            _ => {
                return Err(ParseError::unexpected(
                    "an int, float, string, bool, name or call",
                    &token,
                ))
            }
        }
        Ok(())
    }

    /// A name reference: leading dots, an identifier, then any bracketed
    /// index expressions. Emits the ops that leave the fully-qualified name
    /// string on the stack; `a[5]` is simply the variable named `a[5]`.
    pub(crate) fn name_reference(&mut self, code: &mut Code, first: Token) -> ParseResult<()> {
        let mut name = first.text.clone();
        let mut token = first;
        while token.kind == TokenKind::Dot {
            token = self.get();
            name.push_str(&token.text);
        }
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::unexpected("a name or '.'", &token));
        }
        code.push(Op::PushString(name));
        while self.peek_kind(0) == TokenKind::LeftBracket {
            self.skip(1);
            code.push(Op::PushString("[".to_string()));
            code.push(Op::Add);
            self.expression(code)?;
            code.push(Op::Add);
            self.expect(TokenKind::RightBracket, "']'")?;
            code.push(Op::PushString("]".to_string()));
            code.push(Op::Add);
        }
        Ok(())
    }

    /// The right-hand side of `=`: a function literal when the four-token
    /// lookahead says so, any expression otherwise. Ends with the store.
    pub(crate) fn assignment(&mut self, code: &mut Code) -> ParseResult<()> {
        if self.peek_kind(0) == TokenKind::LeftParen && self.function_literal_follows() {
            let params = self.parameters()?;
            let body = self.block(params)?;
            code.push(Op::PushFunction(Rc::new(body)));
        } else {
            self.expression(code)?;
        }
        code.push(Op::StoreDynamic);
        Ok(())
    }

    /// Distinguishes `= () { ... }` and `= (x, y) { ... }` from a
    /// parenthesised expression such as `= (x)` or `= (x + 1)`.
    fn function_literal_follows(&mut self) -> bool {
        match self.peek_kind(1) {
            TokenKind::RightParen => true,
            TokenKind::Identifier => {
                self.peek_kind(2) == TokenKind::Comma
                    || (self.peek_kind(2) == TokenKind::RightParen
                        && self.peek_kind(3) == TokenKind::LeftBrace)
            }
            _ => false,
        }
    }

    /// `( name, name, ... )` of a function literal. Each parameter becomes a
    /// `StoreName` prefix op; the caller pushes arguments in reverse, so the
    /// prefix binds them back in source order.
    fn parameters(&mut self) -> ParseResult<Code> {
        self.skip(1); // the opening parenthesis, already seen by the lookahead
        let mut prefix = Code::new();
        loop {
            let token = self.get();
            match token.kind {
                TokenKind::RightParen => return Ok(prefix),
                TokenKind::Identifier => {
                    prefix.push(Op::StoreName(token.text));
                    match self.peek_kind(0) {
                        TokenKind::Comma => self.skip(1),
                        TokenKind::RightParen => {}
                        _ => {
                            let next = self.peek(0).clone();
                            return Err(ParseError::unexpected("',' or ')'", &next));
                        }
                    }
                }
                _ => return Err(ParseError::unexpected("a parameter name", &token)),
            }
        }
    }

    /// A comma-separated argument list after a consumed `(`. Returns the
    /// argument count.
    pub(crate) fn arguments(&mut self, code: &mut Code) -> ParseResult<usize> {
        let mut count = 0;
        while self.peek_kind(0) != TokenKind::RightParen {
            count += 1;
            self.expression(code)?;
            match self.peek_kind(0) {
                TokenKind::Comma => self.skip(1),
                TokenKind::RightParen => {}
                _ => {
                    let next = self.peek(0).clone();
                    return Err(ParseError::unexpected("',' or ')'", &next));
                }
            }
        }
        self.skip(1);
        Ok(count)
    }
}

/// Interpret the escapes of a string literal lexeme (quotes included) into
/// its runtime value.
fn unescape(token: &Token) -> Result<String, ParseError> {
    let inner = &token.text[1..token.text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            _ => return Err(ParseError::unexpected("a string", token)),
        }
    }
    Ok(out)
}
