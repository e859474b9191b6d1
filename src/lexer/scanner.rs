//! Single-pass scanner for YAIL source code.

use crate::lexer::token::{Token, TokenKind, KEYWORDS, TWO_RUNE_OPERATORS};

/// The scanner turns UTF-8 source text into tokens, one call at a time.
///
/// Disambiguation order, per rune: single-rune punctuation (a newline is an
/// end-of-statement token), whitespace, the `/` family (comments or
/// division), two-rune operators, keywords and `@`-built-ins with a word
/// boundary check, the conflict-resolvable single runes, numbers, strings,
/// identifiers. Anything else is an error token, after which the scanner
/// parks at end of input.
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// Scan the next token. At end of input this keeps returning EOF tokens.
    pub fn scan_token(&mut self) -> Token {
        loop {
            let Some(c) = self.rest().chars().next() else {
                return Token::eof(self.line);
            };

            if let Some(kind) = single_rune(c) {
                return self.token(kind, c.len_utf8());
            }
            if c.is_whitespace() {
                self.pos += c.len_utf8();
                continue;
            }
            // Handles `//`, `/* ... */` and plain division, so `/` never
            // reaches the conflict table below.
            if c == '/' {
                match self.slash() {
                    Some(token) => return token,
                    None => continue,
                }
            }
            for &(text, kind) in TWO_RUNE_OPERATORS {
                if self.rest().starts_with(text) {
                    return self.token(kind, text.len());
                }
            }
            for &(text, kind) in KEYWORDS {
                if self.rest().starts_with(text) {
                    // `iface` must not lex as `if` + `ace`.
                    let boundary = self.rest()[text.len()..].chars().next();
                    if !boundary.is_some_and(char::is_alphanumeric) {
                        return self.token(kind, text.len());
                    }
                }
            }
            if let Some(kind) = conflicting_rune(c) {
                return self.token(kind, 1);
            }
            if c.is_numeric() {
                return self.scan_number();
            }
            if c == '"' {
                return self.scan_string();
            }
            if c.is_alphabetic() {
                return self.scan_identifier();
            }

            let token = self.token(TokenKind::Error, c.len_utf8());
            self.pos = self.source.len();
            return token;
        }
    }

    /// `//` consumes through the next newline and yields an end-of-statement
    /// token; `/*` consumes through `*/` (or end of input) and yields
    /// nothing; anything else is division.
    fn slash(&mut self) -> Option<Token> {
        let rest = self.rest();
        if rest.starts_with("//") {
            let line = self.line;
            match rest.find('\n') {
                Some(i) => {
                    self.pos += i + 1;
                    self.line += 1;
                }
                None => self.pos = self.source.len(),
            }
            return Some(Token::new(TokenKind::EndOfStatement, "", line));
        }
        if rest.starts_with("/*") {
            let end = rest[2..].find("*/").map_or(rest.len(), |i| i + 4);
            let newlines = rest[..end].bytes().filter(|&b| b == b'\n').count();
            self.line += newlines;
            self.pos += end;
            return None;
        }
        Some(self.token(TokenKind::Slash, 1))
    }

    /// Digits, optionally followed by `.` and more digits. `16.` is a valid
    /// float.
    fn scan_number(&mut self) -> Token {
        let rest = self.rest();
        let digits = rest
            .char_indices()
            .find(|&(_, c)| !c.is_numeric())
            .map_or(rest.len(), |(i, _)| i);
        let after = &rest[digits..];
        if let Some(fraction) = after.strip_prefix('.') {
            let fraction_digits = fraction
                .char_indices()
                .find(|&(_, c)| !c.is_numeric())
                .map_or(fraction.len(), |(i, _)| i);
            self.token(TokenKind::FloatLiteral, digits + 1 + fraction_digits)
        } else {
            self.token(TokenKind::IntLiteral, digits)
        }
    }

    /// A string literal, quotes included in the lexeme. A quote closes the
    /// literal only when the run of backslashes before it has even length.
    /// Escapes are interpreted later, when the parser turns the lexeme into
    /// a value.
    fn scan_string(&mut self) -> Token {
        let bytes = self.source.as_bytes();
        let open = self.pos;
        let mut i = open + 1;
        loop {
            while i < bytes.len() && bytes[i] != b'"' {
                i += 1;
            }
            if i >= bytes.len() {
                // Unterminated: the rest of the input becomes an error token.
                return self.token(TokenKind::Error, self.source.len() - open);
            }
            let mut backslashes = 0;
            while i - backslashes > open + 1 && bytes[i - backslashes - 1] == b'\\' {
                backslashes += 1;
            }
            if backslashes % 2 == 0 {
                return self.token(TokenKind::StringLiteral, i + 1 - open);
            }
            i += 1;
        }
    }

    /// A Unicode letter followed by letters or numbers.
    fn scan_identifier(&mut self) -> Token {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|&(_, c)| !c.is_alphanumeric())
            .map_or(rest.len(), |(i, _)| i);
        self.token(TokenKind::Identifier, end)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn token(&mut self, kind: TokenKind, len: usize) -> Token {
        let text = &self.source[self.pos..self.pos + len];
        let token = Token::new(kind, text, self.line);
        self.line += text.bytes().filter(|&b| b == b'\n').count();
        self.pos += len;
        token
    }
}

fn single_rune(c: char) -> Option<TokenKind> {
    match c {
        '(' => Some(TokenKind::LeftParen),
        ')' => Some(TokenKind::RightParen),
        '{' => Some(TokenKind::LeftBrace),
        '}' => Some(TokenKind::RightBrace),
        '+' => Some(TokenKind::Plus),
        '-' => Some(TokenKind::Minus),
        '*' => Some(TokenKind::Star),
        '%' => Some(TokenKind::Percent),
        ',' => Some(TokenKind::Comma),
        '.' => Some(TokenKind::Dot),
        '[' => Some(TokenKind::LeftBracket),
        ']' => Some(TokenKind::RightBracket),
        ';' | '\n' => Some(TokenKind::EndOfStatement),
        _ => None,
    }
}

/// Single runes that are prefixes of two-rune operators, reachable only
/// after the two-rune forms failed to match.
fn conflicting_rune(c: char) -> Option<TokenKind> {
    match c {
        '=' => Some(TokenKind::Equal),
        '<' => Some(TokenKind::Less),
        '>' => Some(TokenKind::Greater),
        '!' => Some(TokenKind::Bang),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<(TokenKind, String)> {
        let mut scanner = Scanner::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.scan_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            tokens.push((token.kind, token.text));
        }
        tokens
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).into_iter().map(|(kind, _)| kind).collect()
    }

    #[test]
    fn test_parentheses() {
        assert_eq!(
            scan("()"),
            vec![
                (TokenKind::LeftParen, "(".to_string()),
                (TokenKind::RightParen, ")".to_string()),
            ]
        );
    }

    #[test]
    fn test_braces() {
        assert_eq!(
            kinds("}{"),
            vec![TokenKind::RightBrace, TokenKind::LeftBrace]
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            kinds("-+*/%"),
            vec![
                TokenKind::Minus,
                TokenKind::Plus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
            ]
        );
    }

    #[test]
    fn test_end_of_statement() {
        assert_eq!(
            scan(";\n"),
            vec![
                (TokenKind::EndOfStatement, ";".to_string()),
                (TokenKind::EndOfStatement, "\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_logic_operators() {
        assert_eq!(
            kinds("!||&&"),
            vec![TokenKind::Bang, TokenKind::Or, TokenKind::And]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("< <= >= > != =="),
            vec![
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Greater,
                TokenKind::BangEqual,
                TokenKind::EqualEqual,
            ]
        );
    }

    #[test]
    fn test_indexed_name() {
        assert_eq!(
            scan("xe123b[58]"),
            vec![
                (TokenKind::Identifier, "xe123b".to_string()),
                (TokenKind::LeftBracket, "[".to_string()),
                (TokenKind::IntLiteral, "58".to_string()),
                (TokenKind::RightBracket, "]".to_string()),
            ]
        );
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(
            scan("f = 0.543 -0.234 16."),
            vec![
                (TokenKind::Identifier, "f".to_string()),
                (TokenKind::Equal, "=".to_string()),
                (TokenKind::FloatLiteral, "0.543".to_string()),
                (TokenKind::Minus, "-".to_string()),
                (TokenKind::FloatLiteral, "0.234".to_string()),
                (TokenKind::FloatLiteral, "16.".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_boundary() {
        assert_eq!(
            scan("if ifa while whileb for for3 returni return"),
            vec![
                (TokenKind::If, "if".to_string()),
                (TokenKind::Identifier, "ifa".to_string()),
                (TokenKind::While, "while".to_string()),
                (TokenKind::Identifier, "whileb".to_string()),
                (TokenKind::For, "for".to_string()),
                (TokenKind::Identifier, "for3".to_string()),
                (TokenKind::Identifier, "returni".to_string()),
                (TokenKind::Return, "return".to_string()),
            ]
        );
    }

    #[test]
    fn test_bool_boundary() {
        assert_eq!(
            scan("true1 true false falseb"),
            vec![
                (TokenKind::Identifier, "true1".to_string()),
                (TokenKind::BoolLiteral, "true".to_string()),
                (TokenKind::BoolLiteral, "false".to_string()),
                (TokenKind::Identifier, "falseb".to_string()),
            ]
        );
    }

    #[test]
    fn test_builtins() {
        assert_eq!(
            kinds("@int @float @string @line @char @print @println @rnd"),
            vec![
                TokenKind::ReadInt,
                TokenKind::ReadFloat,
                TokenKind::ReadString,
                TokenKind::ReadLine,
                TokenKind::ReadChar,
                TokenKind::Print,
                TokenKind::Println,
                TokenKind::Rnd,
            ]
        );
    }

    #[test]
    fn test_string_escape_parity() {
        assert_eq!(
            scan(r#""lorem \\ ipsum šlept\\\n \\\" \"foo\"" bar """#),
            vec![
                (
                    TokenKind::StringLiteral,
                    r#""lorem \\ ipsum šlept\\\n \\\" \"foo\"""#.to_string()
                ),
                (TokenKind::Identifier, "bar".to_string()),
                (TokenKind::StringLiteral, r#""""#.to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            scan(r#""abc"#),
            vec![(TokenKind::Error, r#""abc"#.to_string())]
        );
    }

    #[test]
    fn test_line_comment() {
        assert_eq!(
            scan("1 // comment\n2"),
            vec![
                (TokenKind::IntLiteral, "1".to_string()),
                (TokenKind::EndOfStatement, "".to_string()),
                (TokenKind::IntLiteral, "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_block_comment() {
        assert_eq!(
            kinds("1 /* one\ntwo */ 2"),
            vec![TokenKind::IntLiteral, TokenKind::IntLiteral]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert_eq!(kinds("1 /* rest"), vec![TokenKind::IntLiteral]);
    }

    #[test]
    fn test_halts_after_error() {
        assert_eq!(scan("#@int"), vec![(TokenKind::Error, "#".to_string())]);
    }

    #[test]
    fn test_lexeme_lengths_cover_input() {
        let source = "if(a==1){b[2]=a+3.5}";
        let total: usize = scan(source).iter().map(|(_, text)| text.len()).sum();
        assert_eq!(total, source.len());
    }

    #[test]
    fn test_line_numbers() {
        let mut scanner = Scanner::new("a\nb\n\"x\ny\"\nc");
        let mut lines = Vec::new();
        loop {
            let token = scanner.scan_token();
            if token.kind == TokenKind::Eof {
                break;
            }
            lines.push((token.text.clone(), token.line));
        }
        assert_eq!(
            lines,
            vec![
                ("a".to_string(), 1),
                ("\n".to_string(), 1),
                ("b".to_string(), 2),
                ("\n".to_string(), 2),
                ("\"x\ny\"".to_string(), 3),
                ("\n".to_string(), 4),
                ("c".to_string(), 5),
            ]
        );
    }
}
