//! Minimal scanning helpers shared by the wire parser and the in-memory
//! header grammars.

use std::io::{self, Read};

/// Byte-at-a-time reader with one byte of lookahead.
///
/// The single-byte lookahead matters: the wire parser must never consume
/// past the head's final CRLF, because everything after it belongs to the
/// body framing.
pub(crate) struct Scanner<R> {
    inner: R,
    peeked: Option<u8>,
}

impl<R: Read> Scanner<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    pub(crate) fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.peeked.take() {
            return Ok(Some(byte));
        }
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub(crate) fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        if self.peeked.is_none() {
            self.peeked = self.next_byte()?;
        }
        Ok(self.peeked)
    }

    /// Reads up to and including `delim`, returning the bytes before it.
    /// Returns `None` when the input ends before the delimiter.
    pub(crate) fn bytes_until(&mut self, delim: u8) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        loop {
            match self.next_byte()? {
                Some(byte) if byte == delim => return Ok(Some(line)),
                Some(byte) => line.push(byte),
                None => return Ok(None),
            }
        }
    }
}

/// In-memory cursor over a header value, in the spirit of the wire
/// scanner but sliceable.
pub(crate) struct StrScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> StrScanner<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    pub(crate) fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    pub(crate) fn ignore_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    /// Takes bytes until `pred` matches, leaving the matching byte in
    /// place. `pred` must only match ASCII so the cut stays on a char
    /// boundary.
    pub(crate) fn take_until(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if pred(byte) {
                break;
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// Takes bytes up to `delim`, consuming the delimiter; without one,
    /// takes the rest of the input.
    pub(crate) fn take_line(&mut self, delim: u8) -> &'a str {
        let taken = self.take_until(|byte| byte == delim);
        if !self.eof() {
            self.pos += 1;
        }
        taken
    }

    pub(crate) fn remaining(&mut self) -> &'a str {
        let rest = &self.input[self.pos..];
        self.pos = self.input.len();
        rest
    }
}

/// Reads a quoted string body from `scanner`, which must be positioned on
/// the opening `"`. Processes `\` escapes. Returns `None` when the input
/// ends before the closing quote.
pub(crate) fn quoted_string(scanner: &mut StrScanner<'_>) -> Option<String> {
    scanner.next_byte();
    let mut value = Vec::new();
    let mut escaped = false;
    loop {
        let byte = scanner.next_byte()?;
        if !escaped {
            if byte == b'"' {
                return Some(String::from_utf8_lossy(&value).into_owned());
            }
            if byte == b'\\' {
                escaped = true;
                continue;
            }
        } else {
            escaped = false;
        }
        value.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_peek_does_not_consume() {
        let mut scanner = Scanner::new(&b"ab"[..]);
        assert_eq!(scanner.peek_byte().unwrap(), Some(b'a'));
        assert_eq!(scanner.next_byte().unwrap(), Some(b'a'));
        assert_eq!(scanner.next_byte().unwrap(), Some(b'b'));
        assert_eq!(scanner.next_byte().unwrap(), None);
    }

    #[test]
    fn bytes_until_requires_the_delimiter() {
        let mut scanner = Scanner::new(&b"one\rtwo"[..]);
        assert_eq!(scanner.bytes_until(b'\r').unwrap().unwrap(), b"one");
        assert_eq!(scanner.bytes_until(b'\r').unwrap(), None);
    }

    #[test]
    fn str_scanner_take_line() {
        let mut scanner = StrScanner::new("name=value");
        assert_eq!(scanner.take_line(b'='), "name");
        assert_eq!(scanner.remaining(), "value");

        let mut scanner = StrScanner::new("flag");
        assert_eq!(scanner.take_line(b'='), "flag");
        assert!(scanner.eof());
    }

    #[test]
    fn quoted_strings_unescape() {
        let mut scanner = StrScanner::new(r#""a \"b\" \\c" rest"#);
        assert_eq!(quoted_string(&mut scanner).unwrap(), r#"a "b" \c"#);
        assert_eq!(scanner.remaining(), " rest");

        let mut scanner = StrScanner::new(r#""unterminated"#);
        assert_eq!(quoted_string(&mut scanner), None);
    }
}
