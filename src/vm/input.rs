//! Byte-stream reader for the read opcodes.

use std::io::BufRead;

use crate::error::RuntimeError;

/// A rune-at-a-time reader over the program's input stream, with a one-rune
/// pushback slot so that token reads can stop at a delimiter without losing
/// it for a following line read.
pub struct Input<R> {
    reader: R,
    pending: Option<char>,
}

impl<R: BufRead> Input<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: None,
        }
    }

    /// Read exactly one rune. End of input is a read failure.
    pub fn read_char(&mut self) -> Result<char, RuntimeError> {
        self.next_char()?
            .ok_or_else(|| RuntimeError::read_failed("unexpected end of input"))
    }

    /// Read up to and including the next newline. End of input before a
    /// newline is a read failure.
    pub fn read_line(&mut self) -> Result<String, RuntimeError> {
        let mut line = String::new();
        loop {
            match self.next_char()? {
                None => return Err(RuntimeError::read_failed("unexpected end of input")),
                Some('\n') => {
                    line.push('\n');
                    return Ok(line);
                }
                Some(c) => line.push(c),
            }
        }
    }

    /// Read the next whitespace-delimited word. The terminating whitespace
    /// rune, if any, is pushed back.
    pub fn read_token(&mut self) -> Result<String, RuntimeError> {
        let first = loop {
            match self.next_char()? {
                None => return Err(RuntimeError::read_failed("unexpected end of input")),
                Some(c) if c.is_whitespace() => continue,
                Some(c) => break c,
            }
        };
        let mut word = String::new();
        word.push(first);
        loop {
            match self.next_char()? {
                None => return Ok(word),
                Some(c) if c.is_whitespace() => {
                    self.pending = Some(c);
                    return Ok(word);
                }
                Some(c) => word.push(c),
            }
        }
    }

    pub fn read_int(&mut self) -> Result<i64, RuntimeError> {
        let word = self.read_token()?;
        word.parse().map_err(|_| {
            RuntimeError::read_failed(format!("expected an integer, got '{}'", word))
        })
    }

    pub fn read_float(&mut self) -> Result<f64, RuntimeError> {
        let word = self.read_token()?;
        word.parse()
            .map_err(|_| RuntimeError::read_failed(format!("expected a float, got '{}'", word)))
    }

    fn next_char(&mut self) -> Result<Option<char>, RuntimeError> {
        if let Some(c) = self.pending.take() {
            return Ok(Some(c));
        }
        self.decode_char()
    }

    /// Decode one UTF-8 rune from the stream.
    fn decode_char(&mut self) -> Result<Option<char>, RuntimeError> {
        let Some(first) = self.read_byte()? else {
            return Ok(None);
        };
        let width = match first {
            0x00..=0x7f => 1,
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Err(RuntimeError::read_failed("invalid UTF-8 in input")),
        };
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(width).skip(1) {
            *slot = self
                .read_byte()?
                .ok_or_else(|| RuntimeError::read_failed("truncated UTF-8 in input"))?;
        }
        let decoded = std::str::from_utf8(&buf[..width])
            .map_err(|_| RuntimeError::read_failed("invalid UTF-8 in input"))?;
        Ok(decoded.chars().next())
    }

    fn read_byte(&mut self) -> Result<Option<u8>, RuntimeError> {
        let buf = self
            .reader
            .fill_buf()
            .map_err(|e| RuntimeError::read_failed(e.to_string()))?;
        if buf.is_empty() {
            return Ok(None);
        }
        let byte = buf[0];
        self.reader.consume(1);
        Ok(Some(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn input(text: &str) -> Input<Cursor<&[u8]>> {
        Input::new(Cursor::new(text.as_bytes()))
    }

    #[test]
    fn test_read_int_skips_whitespace() {
        let mut reader = input("  \n 42\t-7");
        assert_eq!(reader.read_int().unwrap(), 42);
        assert_eq!(reader.read_int().unwrap(), -7);
    }

    #[test]
    fn test_read_token_pushes_back_delimiter() {
        let mut reader = input("42 rest of line\nnext");
        assert_eq!(reader.read_int().unwrap(), 42);
        assert_eq!(reader.read_line().unwrap(), " rest of line\n");
        assert_eq!(reader.read_token().unwrap(), "next");
    }

    #[test]
    fn test_read_float() {
        let mut reader = input("3.5 4");
        assert_eq!(reader.read_float().unwrap(), 3.5);
        assert_eq!(reader.read_float().unwrap(), 4.0);
    }

    #[test]
    fn test_read_char_multibyte() {
        let mut reader = input("šab");
        assert_eq!(reader.read_char().unwrap(), 'š');
        assert_eq!(reader.read_char().unwrap(), 'a');
    }

    #[test]
    fn test_read_line_requires_newline() {
        let mut reader = input("no newline");
        assert!(reader.read_line().is_err());
    }

    #[test]
    fn test_read_int_rejects_garbage() {
        let mut reader = input("3x");
        assert!(reader.read_int().is_err());
    }

    #[test]
    fn test_read_at_end_of_input_fails() {
        let mut reader = input("");
        assert!(reader.read_int().is_err());
        assert!(reader.read_char().is_err());
    }
}
