//! Compiles textual JSONPath-subset expressions into [`PathExpression`].

use super::{FilterExpr, FilterLiteral, FilterOp, PathExpression, PathSegment};
use crate::error::{Error, Result};

/// A one-shot compiler over a path expression's source text.
///
/// `PathParser` works directly on the input `&str`'s bytes; paths are short
/// and always fully available in memory, unlike the document being
/// streamed, so there's no chunked byte source here.
pub struct PathParser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PathParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    pub fn parse(mut self) -> Result<PathExpression> {
        if self.bytes.is_empty() {
            return Err(Error::path("path expression is empty", self.text));
        }
        if self.bytes[0] != b'$' {
            return Err(Error::path("path expression must start with '$'", self.text));
        }
        self.pos = 1;

        let mut segments = vec![PathSegment::Root];
        while self.pos < self.bytes.len() {
            segments.push(self.parse_segment()?);
        }
        Ok(PathExpression::new(self.text.to_string(), segments))
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::path(message, self.text)
    }

    fn parse_segment(&mut self) -> Result<PathSegment> {
        match self.peek_byte() {
            Some(b'.') => {
                self.pos += 1;
                if self.peek_byte() == Some(b'.') {
                    self.pos += 1;
                    let name = self.parse_identifier()?;
                    Ok(PathSegment::Property { name, recursive: true })
                } else if self.peek_byte() == Some(b'*') {
                    self.pos += 1;
                    Ok(PathSegment::Wildcard)
                } else {
                    let name = self.parse_identifier()?;
                    Ok(PathSegment::Property { name, recursive: false })
                }
            }
            Some(b'[') => self.parse_bracket_segment(),
            Some(other) => Err(self.err(format!("unexpected character '{}' in path", other as char))),
            None => Err(self.err("unexpected end of path expression")),
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(byte) = self.peek_byte() {
            if byte.is_ascii_alphanumeric() || byte == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.err("expected property name"));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn parse_bracket_segment(&mut self) -> Result<PathSegment> {
        self.pos += 1; // consume '['
        let segment = match self.peek_byte() {
            Some(b'*') => {
                self.pos += 1;
                PathSegment::Wildcard
            }
            Some(b'"') | Some(b'\'') => {
                let name = self.parse_quoted_string()?;
                PathSegment::Property { name, recursive: false }
            }
            Some(b'?') => self.parse_filter()?,
            _ => self.parse_index_or_slice()?,
        };
        if self.peek_byte() != Some(b']') {
            return Err(self.err("unclosed '[' in path expression"));
        }
        self.pos += 1;
        Ok(segment)
    }

    fn parse_quoted_string(&mut self) -> Result<String> {
        let quote = self.peek_byte().expect("caller checked quote byte");
        self.pos += 1;
        let start = self.pos;
        while let Some(byte) = self.peek_byte() {
            if byte == quote {
                let name = self.text[start..self.pos].to_string();
                self.pos += 1;
                return Ok(name);
            }
            self.pos += 1;
        }
        Err(self.err("unterminated quoted property name"))
    }

    fn parse_signed_int(&mut self) -> Result<i64> {
        let start = self.pos;
        if self.peek_byte() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while let Some(b'0'..=b'9') = self.peek_byte() {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(self.err("expected integer"));
        }
        self.text[start..self.pos]
            .parse()
            .map_err(|_| self.err("invalid integer literal"))
    }

    fn parse_index_or_slice(&mut self) -> Result<PathSegment> {
        let mut parts: Vec<Option<i64>> = vec![None];
        if matches!(self.peek_byte(), Some(b'-') | Some(b'0'..=b'9')) {
            *parts.last_mut().expect("non-empty") = Some(self.parse_signed_int()?);
        }

        if self.peek_byte() != Some(b':') {
            let value = parts[0].ok_or_else(|| self.err("expected index or slice"))?;
            return Ok(PathSegment::Index(value));
        }

        while self.peek_byte() == Some(b':') {
            self.pos += 1;
            parts.push(None);
            if matches!(self.peek_byte(), Some(b'-') | Some(b'0'..=b'9')) {
                *parts.last_mut().expect("just pushed") = Some(self.parse_signed_int()?);
            }
        }
        if parts.len() > 3 {
            return Err(self.err("too many ':' in slice"));
        }
        let start = parts[0];
        let end = parts.get(1).copied().flatten();
        let step = parts.get(2).copied().flatten().unwrap_or(1);
        if step < 1 {
            return Err(self.err("slice step must be >= 1"));
        }
        Ok(PathSegment::Slice { start, end, step })
    }

    fn parse_filter(&mut self) -> Result<PathSegment> {
        self.pos += 1; // consume '?'
        if self.peek_byte() != Some(b'(') {
            return Err(self.err("expected '(' after '?' in filter"));
        }
        self.pos += 1;

        if self.peek_byte() != Some(b'@') {
            return Err(self.err("filter expression must start with '@'"));
        }
        self.pos += 1;

        let mut property_chain = Vec::new();
        while self.peek_byte() == Some(b'.') {
            self.pos += 1;
            property_chain.push(self.parse_identifier()?);
        }

        self.skip_spaces();
        let (op, literal) = if self.peek_byte() == Some(b')') {
            (None, None)
        } else {
            let op = self.parse_filter_op()?;
            self.skip_spaces();
            let literal = self.parse_filter_literal()?;
            (Some(op), Some(literal))
        };

        self.skip_spaces();
        if self.peek_byte() != Some(b')') {
            return Err(self.err("unclosed '(' in filter expression"));
        }
        self.pos += 1;

        Ok(PathSegment::Filter(FilterExpr {
            property_chain,
            op,
            literal,
        }))
    }

    fn skip_spaces(&mut self) {
        while self.peek_byte() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn parse_filter_op(&mut self) -> Result<FilterOp> {
        const OPS: &[(&str, FilterOp)] = &[
            ("===", FilterOp::StrictEq),
            ("!==", FilterOp::StrictNe),
            ("==", FilterOp::Eq),
            ("<>", FilterOp::Ne),
            ("!=", FilterOp::Ne),
            ("<=", FilterOp::Le),
            (">=", FilterOp::Ge),
            ("=", FilterOp::Eq),
            ("<", FilterOp::Lt),
            (">", FilterOp::Gt),
        ];
        let remaining = &self.text[self.pos..];
        for (symbol, op) in OPS {
            if remaining.starts_with(symbol) {
                self.pos += symbol.len();
                return Ok(*op);
            }
        }
        Err(self.err("expected comparison operator in filter"))
    }

    fn parse_filter_literal(&mut self) -> Result<FilterLiteral> {
        match self.peek_byte() {
            Some(b'"') | Some(b'\'') => Ok(FilterLiteral::String(self.parse_quoted_string()?)),
            Some(b't') if self.text[self.pos..].starts_with("true") => {
                self.pos += 4;
                Ok(FilterLiteral::Bool(true))
            }
            Some(b'f') if self.text[self.pos..].starts_with("false") => {
                self.pos += 5;
                Ok(FilterLiteral::Bool(false))
            }
            Some(b'n') if self.text[self.pos..].starts_with("null") => {
                self.pos += 4;
                Ok(FilterLiteral::Null)
            }
            Some(b'-') | Some(b'0'..=b'9') => {
                let start = self.pos;
                if self.peek_byte() == Some(b'-') {
                    self.pos += 1;
                }
                while let Some(b'0'..=b'9') = self.peek_byte() {
                    self.pos += 1;
                }
                let mut is_float = false;
                if self.peek_byte() == Some(b'.') {
                    is_float = true;
                    self.pos += 1;
                    while let Some(b'0'..=b'9') = self.peek_byte() {
                        self.pos += 1;
                    }
                }
                let raw = &self.text[start..self.pos];
                if is_float {
                    raw.parse()
                        .map(FilterLiteral::Float)
                        .map_err(|_| self.err("invalid float literal in filter"))
                } else {
                    raw.parse()
                        .map(FilterLiteral::Integer)
                        .map_err(|_| self.err("invalid integer literal in filter"))
                }
            }
            _ => Err(self.err("expected a literal in filter expression")),
        }
    }
}
