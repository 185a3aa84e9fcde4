//! Byte-to-token scanner.
//!
//! [`Lexer`] sits directly on top of a [`ByteSource`] and exposes a single
//! token of lookahead via [`Lexer::peek`]. It never materializes the whole
//! input: strings and numbers are accumulated byte-by-byte into a `String`
//! as they're scanned, and structural tokens carry no payload at all.

use crate::byte_source::ByteSource;
use crate::error::{Error, Position, Result};
use crate::token::{Token, TokenKind, TokenValue};
use std::io::Read;

/// Scans a byte stream into a sequence of [`Token`]s.
pub struct Lexer<R> {
    source: ByteSource<R>,
    lookahead: Option<Token>,
}

impl<R: Read> Lexer<R> {
    pub fn new(source: ByteSource<R>) -> Self {
        Self {
            source,
            lookahead: None,
        }
    }

    /// 1-based `(line, column)` of the next unconsumed byte.
    fn position(&self) -> Position {
        let (line, column) = self.source.position();
        Position::new(line + 1, column + 1)
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token> {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.scan()?);
        }
        Ok(self.lookahead.as_ref().expect("just filled"))
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(token) = self.lookahead.take() {
            return Ok(token);
        }
        self.scan()
    }

    /// Discards buffering state and hands back the underlying stream.
    pub(crate) fn into_inner(self) -> R {
        self.source.into_inner()
    }

    /// Rewinds the underlying stream to byte 0 and clears lookahead.
    pub(crate) fn reset_source(&mut self) -> Result<()>
    where
        R: std::io::Seek,
    {
        self.source.reset()?;
        self.lookahead = None;
        Ok(())
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            match self.source.peek(0)? {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.source.read_byte()?;
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan(&mut self) -> Result<Token> {
        self.skip_whitespace()?;
        let position = self.position();
        let byte = match self.source.read_byte()? {
            Some(b) => b,
            None => return Ok(Token::new(TokenKind::Eof, TokenValue::None, position.line, position.column)),
        };

        match byte {
            b'{' => Ok(Token::new(TokenKind::LBrace, TokenValue::None, position.line, position.column)),
            b'}' => Ok(Token::new(TokenKind::RBrace, TokenValue::None, position.line, position.column)),
            b'[' => Ok(Token::new(TokenKind::LBracket, TokenValue::None, position.line, position.column)),
            b']' => Ok(Token::new(TokenKind::RBracket, TokenValue::None, position.line, position.column)),
            b':' => Ok(Token::new(TokenKind::Colon, TokenValue::None, position.line, position.column)),
            b',' => Ok(Token::new(TokenKind::Comma, TokenValue::None, position.line, position.column)),
            b'"' => self.scan_string(position),
            b'-' | b'0'..=b'9' => self.scan_number(byte, position),
            b't' => self.scan_keyword(b"rue", TokenKind::True, position),
            b'f' => self.scan_keyword(b"alse", TokenKind::False, position),
            b'n' => self.scan_keyword(b"ull", TokenKind::Null, position),
            other => Err(Error::parse(
                format!("unexpected character {:?}", other as char),
                position,
            )),
        }
    }

    /// `first_byte` has already been consumed; `rest` is the remainder of the
    /// keyword's spelling (e.g. `b"rue"` after the `t` of `true`).
    fn scan_keyword(&mut self, rest: &[u8], kind: TokenKind, position: Position) -> Result<Token> {
        for &expected in rest {
            match self.source.read_byte()? {
                Some(b) if b == expected => {}
                Some(b) => {
                    return Err(Error::parse(
                        format!("unexpected character {:?} in keyword", b as char),
                        position,
                    ))
                }
                None => return Err(Error::parse("unexpected end of input in keyword", position)),
            }
        }
        Ok(Token::new(kind, TokenValue::None, position.line, position.column))
    }

    fn scan_string(&mut self, position: Position) -> Result<Token> {
        let mut out = String::new();
        loop {
            let byte = self
                .source
                .read_byte()?
                .ok_or_else(|| Error::parse("unterminated string", position))?;
            match byte {
                b'"' => {
                    return Ok(Token::new(TokenKind::String, TokenValue::Str(out), position.line, position.column))
                }
                b'\\' => self.scan_escape(&mut out, position)?,
                0x00..=0x1f => {
                    return Err(Error::parse(
                        format!("control character {byte:#04x} in string"),
                        position,
                    ))
                }
                0x00..=0x7f => out.push(byte as char),
                _ => self.scan_utf8_continuation(byte, &mut out, position)?,
            }
        }
    }

    fn scan_escape(&mut self, out: &mut String, position: Position) -> Result<()> {
        let escape = self
            .source
            .read_byte()?
            .ok_or_else(|| Error::parse("unterminated escape sequence", position))?;
        match escape {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{0008}'),
            b'f' => out.push('\u{000c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let first = self.scan_unicode_escape(position)?;
                if (0xd800..=0xdbff).contains(&first) {
                    let backslash = self
                        .source
                        .read_byte()?
                        .ok_or_else(|| Error::parse("unterminated surrogate pair", position))?;
                    if backslash != b'\\' {
                        return Err(Error::parse("expected low surrogate escape", position));
                    }
                    let u = self
                        .source
                        .read_byte()?
                        .ok_or_else(|| Error::parse("unterminated surrogate pair", position))?;
                    if u != b'u' {
                        return Err(Error::parse("expected low surrogate escape", position));
                    }
                    let second = self.scan_unicode_escape(position)?;
                    if !(0xdc00..=0xdfff).contains(&second) {
                        return Err(Error::parse("invalid low surrogate", position));
                    }
                    let combined =
                        0x10000 + ((first - 0xd800) << 10) + (second - 0xdc00);
                    let ch = char::from_u32(combined)
                        .ok_or_else(|| Error::parse("invalid surrogate pair", position))?;
                    out.push(ch);
                } else {
                    let ch = char::from_u32(first)
                        .ok_or_else(|| Error::parse("invalid unicode escape", position))?;
                    out.push(ch);
                }
            }
            other => {
                return Err(Error::parse(
                    format!("invalid escape sequence \\{}", other as char),
                    position,
                ))
            }
        }
        Ok(())
    }

    fn scan_unicode_escape(&mut self, position: Position) -> Result<u32> {
        let mut value: u32 = 0;
        for _ in 0..4 {
            let byte = self
                .source
                .read_byte()?
                .ok_or_else(|| Error::parse("unterminated unicode escape", position))?;
            let digit = match byte {
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => byte - b'A' + 10,
                _ => return Err(Error::parse("invalid unicode escape digit", position)),
            };
            value = value * 16 + digit as u32;
        }
        Ok(value)
    }

    /// `first` is the already-consumed lead byte of a multi-byte UTF-8
    /// sequence; reads the expected number of continuation bytes and decodes.
    fn scan_utf8_continuation(&mut self, first: u8, out: &mut String, position: Position) -> Result<()> {
        let extra = if first & 0b1110_0000 == 0b1100_0000 {
            1
        } else if first & 0b1111_0000 == 0b1110_0000 {
            2
        } else if first & 0b1111_1000 == 0b1111_0000 {
            3
        } else {
            return Err(Error::parse("invalid UTF-8 lead byte in string", position));
        };

        let mut bytes = vec![first];
        for _ in 0..extra {
            let byte = self
                .source
                .read_byte()?
                .ok_or_else(|| Error::parse("truncated UTF-8 sequence in string", position))?;
            if byte & 0b1100_0000 != 0b1000_0000 {
                return Err(Error::parse("invalid UTF-8 continuation byte in string", position));
            }
            bytes.push(byte);
        }
        let decoded = std::str::from_utf8(&bytes)
            .map_err(|_| Error::parse("invalid UTF-8 sequence in string", position))?;
        out.push_str(decoded);
        Ok(())
    }

    /// `first_byte` (either `-` or an ASCII digit) has already been consumed.
    fn scan_number(&mut self, first_byte: u8, position: Position) -> Result<Token> {
        let mut raw = String::new();
        raw.push(first_byte as char);
        let negative = first_byte == b'-';

        let mut leading_int_digit = first_byte;
        if negative {
            leading_int_digit = self
                .source
                .peek(0)?
                .filter(|b| b.is_ascii_digit())
                .ok_or_else(|| Error::parse("expected digit after '-'", position))?;
            raw.push(leading_int_digit as char);
            self.source.read_byte()?;
        }

        if leading_int_digit == b'0' {
            // A leading zero must stand alone: "0" is valid, "01" is not.
            if let Some(b'0'..=b'9') = self.source.peek(0)? {
                return Err(Error::parse("number has leading zero", position));
            }
        } else {
            loop {
                match self.source.peek(0)? {
                    Some(byte @ b'0'..=b'9') => {
                        raw.push(byte as char);
                        self.source.read_byte()?;
                    }
                    _ => break,
                }
            }
        }

        let mut is_float = false;

        if let Some(b'.') = self.source.peek(0)? {
            is_float = true;
            raw.push('.');
            self.source.read_byte()?;
            let mut saw_digit = false;
            loop {
                match self.source.peek(0)? {
                    Some(byte @ b'0'..=b'9') => {
                        saw_digit = true;
                        raw.push(byte as char);
                        self.source.read_byte()?;
                    }
                    _ => break,
                }
            }
            if !saw_digit {
                return Err(Error::parse("expected digit after '.'", position));
            }
        }

        if let Some(byte @ (b'e' | b'E')) = self.source.peek(0)? {
            is_float = true;
            raw.push(byte as char);
            self.source.read_byte()?;
            if let Some(sign @ (b'+' | b'-')) = self.source.peek(0)? {
                raw.push(sign as char);
                self.source.read_byte()?;
            }
            let mut saw_digit = false;
            loop {
                match self.source.peek(0)? {
                    Some(byte @ b'0'..=b'9') => {
                        saw_digit = true;
                        raw.push(byte as char);
                        self.source.read_byte()?;
                    }
                    _ => break,
                }
            }
            if !saw_digit {
                return Err(Error::parse("expected digit in exponent", position));
            }
        }

        if is_float {
            let value: f64 = raw
                .parse()
                .map_err(|_| Error::parse(format!("invalid number literal {raw:?}"), position))?;
            Ok(Token::new(TokenKind::Number, TokenValue::Float(value), position.line, position.column))
        } else {
            match raw.parse::<i64>() {
                Ok(value) => Ok(Token::new(TokenKind::Number, TokenValue::Int(value), position.line, position.column)),
                Err(_) => {
                    // Magnitude exceeds i64 range: promote to Float rather than
                    // failing the parse.
                    let value: f64 = raw.parse().map_err(|_| {
                        Error::parse(format!("invalid number literal {raw:?}"), position)
                    })?;
                    Ok(Token::new(TokenKind::Number, TokenValue::Float(value), position.line, position.column))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_case::test_case;

    fn lex_all(input: &str) -> Result<Vec<Token>> {
        let source = ByteSource::new(Cursor::new(input.as_bytes().to_vec()), 1024)?;
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    #[test]
    fn structural_tokens() {
        let tokens = lex_all("{}[]:,").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Colon,
                TokenKind::Comma,
                TokenKind::Eof,
            ]
        );
    }

    #[test_case("true", TokenKind::True; "true keyword")]
    #[test_case("false", TokenKind::False; "false keyword")]
    #[test_case("null", TokenKind::Null; "null keyword")]
    fn keywords(input: &str, expected: TokenKind) {
        let tokens = lex_all(input).unwrap();
        assert_eq!(tokens[0].kind, expected);
    }

    #[test]
    fn rejects_truncated_keyword() {
        assert!(lex_all("tru").is_err());
    }

    #[test]
    fn simple_string() {
        let tokens = lex_all("\"hello\"").unwrap();
        assert_eq!(tokens[0].as_str(), Some("hello"));
    }

    #[test]
    fn string_with_escapes() {
        let tokens = lex_all(r#""a\nb\tc\"d""#).unwrap();
        assert_eq!(tokens[0].as_str(), Some("a\nb\tc\"d"));
    }

    #[test]
    fn string_with_unicode_escape() {
        let tokens = lex_all(r#""é""#).unwrap();
        assert_eq!(tokens[0].as_str(), Some("\u{e9}"));
    }

    #[test]
    fn string_with_surrogate_pair() {
        let tokens = lex_all(r#""😀""#).unwrap();
        assert_eq!(tokens[0].as_str(), Some("\u{1f600}"));
    }

    #[test]
    fn string_with_multibyte_utf8() {
        let tokens = lex_all("\"caf\u{e9}\"").unwrap();
        assert_eq!(tokens[0].as_str(), Some("caf\u{e9}"));
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(lex_all("\"abc").is_err());
    }

    #[test]
    fn rejects_control_character_in_string() {
        assert!(lex_all("\"a\tb\"").is_err());
    }

    #[test_case("0", TokenValue::Int(0); "zero")]
    #[test_case("42", TokenValue::Int(42); "positive int")]
    #[test_case("-17", TokenValue::Int(-17); "negative int")]
    #[test_case("3.14", TokenValue::Float(3.14); "simple float")]
    #[test_case("-0.5", TokenValue::Float(-0.5); "negative float")]
    #[test_case("1e10", TokenValue::Float(1e10); "exponent")]
    #[test_case("1.5e-3", TokenValue::Float(1.5e-3); "negative exponent")]
    #[test_case("2E+3", TokenValue::Float(2e3); "uppercase exponent with sign")]
    fn numbers(input: &str, expected: TokenValue) {
        let tokens = lex_all(input).unwrap();
        assert_eq!(tokens[0].value, expected);
    }

    #[test]
    fn rejects_leading_zero() {
        assert!(lex_all("012").is_err());
    }

    #[test]
    fn rejects_bare_minus() {
        assert!(lex_all("-").is_err());
    }

    #[test]
    fn rejects_trailing_dot() {
        assert!(lex_all("1.").is_err());
    }

    #[test]
    fn overflowing_integer_promotes_to_float() {
        let tokens = lex_all("99999999999999999999").unwrap();
        match tokens[0].value {
            TokenValue::Float(f) => assert!(f > 0.0),
            ref other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn integer_within_i64_range_stays_integer() {
        let tokens = lex_all("9223372036854775807").unwrap();
        assert_eq!(tokens[0].value, TokenValue::Int(i64::MAX));
    }

    #[test]
    fn peek_does_not_advance_lexer() {
        let source = ByteSource::new(Cursor::new(b"true".to_vec()), 1024).unwrap();
        let mut lexer = Lexer::new(source);
        assert_eq!(lexer.peek().unwrap().kind, TokenKind::True);
        assert_eq!(lexer.peek().unwrap().kind, TokenKind::True);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::True);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn whitespace_is_skipped() {
        let tokens = lex_all("  {  \t\n  } ").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::LBrace, TokenKind::RBrace, TokenKind::Eof]);
    }
}
