//! Token definitions for the YAIL lexer.

use std::fmt;

/// All token kinds in YAIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Structural punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Bang,
    Or,
    And,

    // Keywords
    If,
    Else,
    For,
    While,
    Return,

    // Literals
    BoolLiteral,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    Identifier,

    // @-prefixed built-ins
    ReadInt,
    ReadFloat,
    ReadString,
    ReadLine,
    ReadChar,
    Print,
    Println,
    Rnd,

    /// `;` or a newline.
    EndOfStatement,
    /// An unrecognised rune; the scanner halts after emitting one.
    Error,
    Eof,
}

/// Two-rune operators, checked before keywords and single-rune conflicts.
pub const TWO_RUNE_OPERATORS: &[(&str, TokenKind)] = &[
    ("||", TokenKind::Or),
    ("&&", TokenKind::And),
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::BangEqual),
    (">=", TokenKind::GreaterEqual),
    ("<=", TokenKind::LessEqual),
];

/// Keywords and `@`-built-ins, longest literal first so that `@println`
/// cannot be shadowed by `@print`. A match only counts when the following
/// rune is not alphanumeric.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("@println", TokenKind::Println),
    ("@string", TokenKind::ReadString),
    ("@print", TokenKind::Print),
    ("@float", TokenKind::ReadFloat),
    ("return", TokenKind::Return),
    ("@char", TokenKind::ReadChar),
    ("@line", TokenKind::ReadLine),
    ("false", TokenKind::BoolLiteral),
    ("while", TokenKind::While),
    ("@int", TokenKind::ReadInt),
    ("@rnd", TokenKind::Rnd),
    ("true", TokenKind::BoolLiteral),
    ("else", TokenKind::Else),
    ("for", TokenKind::For),
    ("if", TokenKind::If),
];

/// A token: its kind, the exact source lexeme, and the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn eof(line: usize) -> Self {
        Self::new(TokenKind::Eof, "", line)
    }

    /// How the token reads in a diagnostic.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::EndOfStatement if self.text != ";" => "end of statement".to_string(),
            TokenKind::Error => format!("invalid input '{}'", self.text),
            _ => format!("'{}'", self.text),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
