//! Token stream to value tree, with lazy container iteration and
//! path-directed streaming.

use std::io::Read;

use crate::config::DepthGuard;
use crate::error::{Error, Position, Result};
use crate::lexer::Lexer;
use crate::path::{PathEvaluator, PathSegment};
use crate::token::{Token, TokenKind, TokenValue};
use crate::value::{JsonObject, Value};

/// Consumes a [`Lexer`] and produces values, lazily where possible.
///
/// `parse_array`/`parse_object` hand back borrowing iterators rather than
/// `Vec`s; callers that need the whole container still call `to_array` /
/// `collect` on those iterators, but nothing is held in memory beyond the
/// elements actually requested.
pub struct Parser<R> {
    lexer: Lexer<R>,
    depth: DepthGuard,
    max_depth: usize,
}

impl<R: Read> Parser<R> {
    pub fn new(lexer: Lexer<R>, max_depth: usize) -> Self {
        Self {
            lexer,
            depth: DepthGuard::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth.depth()
    }

    /// Discards buffering and recursion state and hands back the underlying
    /// stream, used when a reader is reconfigured.
    pub(crate) fn into_inner(self) -> R {
        self.lexer.into_inner()
    }

    /// Rewinds the underlying stream to byte 0 and resets lexer/depth state
    /// in place, used to restart iteration over a seekable stream.
    pub(crate) fn reset(&mut self) -> Result<()>
    where
        R: std::io::Seek,
    {
        self.lexer.reset_source()?;
        self.depth.reset();
        Ok(())
    }

    fn position(&mut self) -> Result<Position> {
        let token = self.lexer.peek()?;
        Ok(Position::new(token.line, token.column))
    }

    fn enter_depth(&mut self) -> Result<()> {
        let position = self.position()?;
        if !self.depth.enter(self.max_depth) {
            return Err(Error::parse("Maximum nesting depth exceeded", position));
        }
        Ok(())
    }

    fn exit_depth(&mut self) {
        self.depth.exit();
    }

    /// Called right after consuming a separating comma: fails if the very
    /// next token is `closer`, i.e. the comma had nothing following it.
    fn reject_trailing_comma(&mut self, closer: TokenKind) -> Result<()> {
        let next = self.lexer.peek()?;
        if next.kind == closer {
            return Err(Error::parse("Trailing comma not allowed", Position::new(next.line, next.column)));
        }
        Ok(())
    }

    /// Parses exactly one JSON value, fully materialized.
    pub fn parse_value(&mut self) -> Result<Value> {
        let token = self.lexer.next_token()?;
        self.value_from_token(token)
    }

    fn value_from_token(&mut self, token: Token) -> Result<Value> {
        match token.kind {
            TokenKind::String => Ok(Value::String(
                token.as_str().expect("String token carries Str value").to_string(),
            )),
            TokenKind::Number => Ok(match token.value {
                TokenValue::Int(i) => Value::Integer(i),
                TokenValue::Float(f) => Value::Float(f),
                _ => unreachable!("Number token always carries Int or Float"),
            }),
            TokenKind::True => Ok(Value::Bool(true)),
            TokenKind::False => Ok(Value::Bool(false)),
            TokenKind::Null => Ok(Value::Null),
            TokenKind::LBrace => self.parse_object_value(token),
            TokenKind::LBracket => self.parse_array_value(token),
            TokenKind::Eof => Err(Error::parse("Unexpected end of file", Position::new(token.line, token.column))),
            _ => Err(Error::parse(
                format!("Unexpected token {}", token.describe()),
                Position::new(token.line, token.column),
            )),
        }
    }

    fn parse_array_value(&mut self, open: Token) -> Result<Value> {
        self.enter_depth()?;
        let mut items = Vec::new();
        let mut first = true;
        loop {
            let token = self.lexer.peek()?.clone();
            if token.kind == TokenKind::RBracket && first {
                self.lexer.next_token()?;
                break;
            }
            if !first {
                let sep = self.lexer.next_token()?;
                match sep.kind {
                    TokenKind::Comma => self.reject_trailing_comma(TokenKind::RBracket)?,
                    TokenKind::RBracket => break,
                    _ => {
                        return Err(Error::parse(
                            "Expected comma or closing bracket",
                            Position::new(sep.line, sep.column),
                        ))
                    }
                }
            }
            let element_token = self.lexer.next_token()?;
            items.push(self.value_from_token(element_token)?);
            first = false;
        }
        self.exit_depth();
        let _ = open;
        Ok(Value::Array(items))
    }

    fn parse_object_value(&mut self, open: Token) -> Result<Value> {
        self.enter_depth()?;
        let mut obj = JsonObject::new();
        let mut first = true;
        loop {
            let token = self.lexer.peek()?.clone();
            if token.kind == TokenKind::RBrace && first {
                self.lexer.next_token()?;
                break;
            }
            if !first {
                let sep = self.lexer.next_token()?;
                match sep.kind {
                    TokenKind::Comma => self.reject_trailing_comma(TokenKind::RBrace)?,
                    TokenKind::RBrace => break,
                    _ => {
                        return Err(Error::parse(
                            "Expected comma or closing brace",
                            Position::new(sep.line, sep.column),
                        ))
                    }
                }
            }
            let key_token = self.lexer.next_token()?;
            let key = key_token
                .as_str()
                .ok_or_else(|| Error::parse("Expected string key", Position::new(key_token.line, key_token.column)))?
                .to_string();
            let colon = self.lexer.next_token()?;
            if colon.kind != TokenKind::Colon {
                return Err(Error::parse("Expected ':'", Position::new(colon.line, colon.column)));
            }
            let value = self.parse_value()?;
            obj.insert(key, value);
            first = false;
        }
        self.exit_depth();
        let _ = open;
        Ok(Value::Object(obj))
    }

    /// Consumes exactly one value without materializing nested structure.
    /// Used to discard non-matching subtrees during path-directed parsing.
    pub fn skip_value(&mut self) -> Result<()> {
        let token = self.lexer.next_token()?;
        match token.kind {
            TokenKind::LBrace => self.skip_container(TokenKind::RBrace),
            TokenKind::LBracket => self.skip_container(TokenKind::RBracket),
            TokenKind::String | TokenKind::Number | TokenKind::True | TokenKind::False | TokenKind::Null => Ok(()),
            TokenKind::Eof => Err(Error::parse("Unexpected end of file", Position::new(token.line, token.column))),
            _ => Err(Error::parse(
                format!("Unexpected token {}", token.describe()),
                Position::new(token.line, token.column),
            )),
        }
    }

    fn skip_container(&mut self, closing: TokenKind) -> Result<()> {
        let mut nesting = 1usize;
        loop {
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::LBrace | TokenKind::LBracket => nesting += 1,
                TokenKind::RBrace | TokenKind::RBracket => {
                    if token.kind == closing || nesting > 1 {
                        nesting -= 1;
                    }
                    if nesting == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Eof => {
                    return Err(Error::parse("Unterminated container", Position::new(token.line, token.column)))
                }
                _ => {}
            }
        }
    }

    /// Begins streaming an array's elements. `LBracket` must already be the
    /// next token; the caller drives iteration via [`Parser::next_array_element`].
    pub fn begin_array(&mut self) -> Result<bool> {
        self.enter_depth()?;
        let open = self.lexer.next_token()?;
        if open.kind != TokenKind::LBracket {
            return Err(Error::parse(
                format!("Expected '[', found {}", open.describe()),
                Position::new(open.line, open.column),
            ));
        }
        let is_empty = self.lexer.peek()?.kind == TokenKind::RBracket;
        if is_empty {
            self.lexer.next_token()?;
            self.exit_depth();
        }
        Ok(!is_empty)
    }

    /// Reads the next array element, given whether this is the first element
    /// requested since `begin_array`. Returns `None` once `]` is reached.
    pub fn next_array_element(&mut self, first: bool) -> Result<Option<Value>> {
        if !first {
            let sep = self.lexer.next_token()?;
            match sep.kind {
                TokenKind::Comma => self.reject_trailing_comma(TokenKind::RBracket)?,
                TokenKind::RBracket => {
                    self.exit_depth();
                    return Ok(None);
                }
                _ => {
                    return Err(Error::parse(
                        "Expected comma or closing bracket",
                        Position::new(sep.line, sep.column),
                    ))
                }
            }
        }
        let token = self.lexer.next_token()?;
        Ok(Some(self.value_from_token(token)?))
    }

    /// Same shape as `begin_array`/`next_array_element` for objects.
    pub fn begin_object(&mut self) -> Result<bool> {
        self.enter_depth()?;
        let open = self.lexer.next_token()?;
        if open.kind != TokenKind::LBrace {
            return Err(Error::parse(
                format!("Expected '{{', found {}", open.describe()),
                Position::new(open.line, open.column),
            ));
        }
        let is_empty = self.lexer.peek()?.kind == TokenKind::RBrace;
        if is_empty {
            self.lexer.next_token()?;
            self.exit_depth();
        }
        Ok(!is_empty)
    }

    pub fn next_object_member(&mut self, first: bool) -> Result<Option<(String, Value)>> {
        if !first {
            let sep = self.lexer.next_token()?;
            match sep.kind {
                TokenKind::Comma => self.reject_trailing_comma(TokenKind::RBrace)?,
                TokenKind::RBrace => {
                    self.exit_depth();
                    return Ok(None);
                }
                _ => {
                    return Err(Error::parse(
                        "Expected comma or closing brace",
                        Position::new(sep.line, sep.column),
                    ))
                }
            }
        }
        let key_token = self.lexer.next_token()?;
        let key = key_token
            .as_str()
            .ok_or_else(|| Error::parse("Expected string key", Position::new(key_token.line, key_token.column)))?
            .to_string();
        let colon = self.lexer.next_token()?;
        if colon.kind != TokenKind::Colon {
            return Err(Error::parse("Expected ':'", Position::new(colon.line, colon.column)));
        }
        let value = self.parse_value()?;
        Ok(Some((key, value)))
    }

    /// Peeks the next structural token without consuming it, used by the
    /// façade to dispatch between object/array/scalar handling.
    pub fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.lexer.peek()?.kind)
    }

    /// Runs the path-directed streaming narrow-down described for
    /// `can_use_simple_streaming` expressions: descend the leading property
    /// chain via `skip_value`, then yield only the elements the selector and
    /// early-termination bound allow, applying the trailing property chain
    /// to each.
    pub fn stream_path_matches(&mut self, evaluator: &PathEvaluator, mut emit: impl FnMut(Value) -> Result<()>) -> Result<()> {
        for name in evaluator.leading_properties() {
            self.descend_to_property(name)?;
        }

        let (_, selector) = evaluator
            .selector()
            .ok_or_else(|| Error::argument("path has no bracketed selector for simple streaming"))?;
        let selector = selector.clone();
        let trailing = evaluator
            .trailing_properties()
            .into_iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>();
        let termination = evaluator.termination_index();

        match selector {
            PathSegment::Wildcard => self.stream_selected_elements(|_| true, termination, &trailing, &mut emit),
            PathSegment::Index(index) => {
                // can_use_simple_streaming rejects negative indices, so this
                // always fits in a usize.
                let target = index as usize;
                self.stream_selected_elements(|i| i == target, termination, &trailing, &mut emit)
            }
            PathSegment::Slice { start, end, step } => {
                let start = start.unwrap_or(0).max(0) as usize;
                let end = end;
                self.stream_selected_elements(
                    move |i| {
                        i >= start
                            && end.map(|e| (i as i64) < e).unwrap_or(true)
                            && (i - start) % (step.max(1) as usize) == 0
                    },
                    termination,
                    &trailing,
                    &mut emit,
                )
            }
            PathSegment::Filter(filter) => {
                self.stream_filtered_elements(&filter, termination, &trailing, &mut emit)
            }
            PathSegment::Root | PathSegment::Property { .. } => {
                Err(Error::argument("selector segment is not a valid simple-streaming selector"))
            }
        }
    }

    fn descend_to_property(&mut self, name: &str) -> Result<()> {
        let has_member = self.begin_object()?;
        if !has_member {
            return Err(Error::argument(format!("property '{name}' not found")));
        }
        let mut first = true;
        loop {
            let member = self
                .next_object_member_shallow(first)?
                .ok_or_else(|| Error::argument(format!("property '{name}' not found")))?;
            first = false;
            if member == name {
                return Ok(());
            }
            self.skip_value()?;
        }
    }

    /// Like `next_object_member`, but returns only the key; the caller is
    /// responsible for consuming the value (materializing or skipping it).
    fn next_object_member_shallow(&mut self, first: bool) -> Result<Option<String>> {
        if !first {
            let sep = self.lexer.next_token()?;
            match sep.kind {
                TokenKind::Comma => self.reject_trailing_comma(TokenKind::RBrace)?,
                TokenKind::RBrace => {
                    self.exit_depth();
                    return Ok(None);
                }
                _ => {
                    return Err(Error::parse(
                        "Expected comma or closing brace",
                        Position::new(sep.line, sep.column),
                    ))
                }
            }
        }
        let key_token = self.lexer.next_token()?;
        let key = key_token
            .as_str()
            .ok_or_else(|| Error::parse("Expected string key", Position::new(key_token.line, key_token.column)))?
            .to_string();
        let colon = self.lexer.next_token()?;
        if colon.kind != TokenKind::Colon {
            return Err(Error::parse("Expected ':'", Position::new(colon.line, colon.column)));
        }
        Ok(Some(key))
    }

    fn stream_selected_elements(
        &mut self,
        matches_index: impl Fn(usize) -> bool,
        termination: Option<usize>,
        trailing: &[String],
        emit: &mut impl FnMut(Value) -> Result<()>,
    ) -> Result<()> {
        let has_element = self.begin_array()?;
        if !has_element {
            return Ok(());
        }
        let mut index = 0usize;
        let mut first = true;
        loop {
            if !first {
                let sep = self.lexer.next_token()?;
                match sep.kind {
                    TokenKind::Comma => self.reject_trailing_comma(TokenKind::RBracket)?,
                    TokenKind::RBracket => {
                        self.exit_depth();
                        return Ok(());
                    }
                    _ => {
                        return Err(Error::parse(
                            "Expected comma or closing bracket",
                            Position::new(sep.line, sep.column),
                        ))
                    }
                }
            }
            first = false;

            if matches_index(index) {
                let mut value = self.parse_value()?;
                value = apply_trailing_properties(value, trailing);
                emit(value)?;
            } else {
                self.skip_value()?;
            }

            index += 1;
            if let Some(limit) = termination {
                if index >= limit {
                    // Remainder of the array is not parsed; caller's stream
                    // is abandoned here per the early-termination contract.
                    return Ok(());
                }
            }
        }
    }

    fn stream_filtered_elements(
        &mut self,
        filter: &crate::path::FilterExpr,
        termination: Option<usize>,
        trailing: &[String],
        emit: &mut impl FnMut(Value) -> Result<()>,
    ) -> Result<()> {
        let has_element = self.begin_array()?;
        if !has_element {
            return Ok(());
        }
        let mut index = 0usize;
        let mut first = true;
        loop {
            if !first {
                let sep = self.lexer.next_token()?;
                match sep.kind {
                    TokenKind::Comma => self.reject_trailing_comma(TokenKind::RBracket)?,
                    TokenKind::RBracket => {
                        self.exit_depth();
                        return Ok(());
                    }
                    _ => {
                        return Err(Error::parse(
                            "Expected comma or closing bracket",
                            Position::new(sep.line, sep.column),
                        ))
                    }
                }
            }
            first = false;

            let value = self.parse_value()?;
            if filter_matches(filter, &value) {
                let value = apply_trailing_properties(value, trailing);
                emit(value)?;
                index += 1;
                if let Some(limit) = termination {
                    if index >= limit {
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn apply_trailing_properties(mut value: Value, trailing: &[String]) -> Value {
    for name in trailing {
        value = match value {
            Value::Object(obj) => obj.iter().find(|(k, _)| *k == name).map(|(_, v)| v.clone()).unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }
    value
}

fn filter_matches(filter: &crate::path::FilterExpr, candidate: &Value) -> bool {
    use crate::path::PathExpression;
    let expr = PathExpression::new(String::new(), vec![PathSegment::Root, PathSegment::Filter(filter.clone())]);
    crate::path::PathFilter::new(&expr).evaluate(candidate).len() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::ByteSource;
    use std::io::Cursor;

    fn parser(input: &str) -> Parser<Cursor<Vec<u8>>> {
        let source = ByteSource::new(Cursor::new(input.as_bytes().to_vec()), 1024).unwrap();
        Parser::new(Lexer::new(source), 512)
    }

    #[test]
    fn parses_scalar_values() {
        assert_eq!(parser("42").parse_value().unwrap(), Value::Integer(42));
        assert_eq!(parser("\"hi\"").parse_value().unwrap(), Value::String("hi".into()));
        assert_eq!(parser("true").parse_value().unwrap(), Value::Bool(true));
        assert_eq!(parser("null").parse_value().unwrap(), Value::Null);
    }

    #[test]
    fn parses_nested_array() {
        let value = parser("[1, [2, 3], 4]").parse_value().unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Integer(1),
                Value::Array(vec![Value::Integer(2), Value::Integer(3)]),
                Value::Integer(4),
            ])
        );
    }

    #[test]
    fn parses_object() {
        let value = parser(r#"{"a": 1, "b": "x"}"#).parse_value().unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("a"), Some(&Value::Integer(1)));
        assert_eq!(obj.get("b"), Some(&Value::String("x".into())));
    }

    #[test]
    fn rejects_trailing_comma_in_array() {
        let err = parser("[1, 2,]").parse_value().unwrap_err();
        assert!(err.to_string().contains("Trailing comma not allowed"));
    }

    #[test]
    fn rejects_trailing_comma_in_object() {
        let err = parser(r#"{"a": 1,}"#).parse_value().unwrap_err();
        assert!(err.to_string().contains("Trailing comma not allowed"));
    }

    #[test]
    fn rejects_missing_colon() {
        assert!(parser(r#"{"a" 1}"#).parse_value().is_err());
    }

    #[test]
    fn rejects_non_string_key() {
        assert!(parser("{1: 2}").parse_value().is_err());
    }

    #[test]
    fn depth_exactly_at_limit_succeeds() {
        let input = "[".repeat(2) + "1" + &"]".repeat(2);
        let mut p = parser(&input);
        p.max_depth = 2;
        assert!(p.parse_value().is_ok());
    }

    #[test]
    fn depth_one_over_limit_fails() {
        let input = "[".repeat(3) + "1" + &"]".repeat(3);
        let mut p = parser(&input);
        p.max_depth = 2;
        assert!(p.parse_value().is_err());
    }

    #[test]
    fn skip_value_consumes_nested_structure() {
        let mut p = parser(r#"{"a": [1, [2, 3]], "b": 2}"#);
        assert!(p.begin_object().unwrap());
        let key = p.next_object_member_shallow(true).unwrap().unwrap();
        assert_eq!(key, "a");
        p.skip_value().unwrap();
        let next = p.next_object_member(false).unwrap();
        assert_eq!(next, Some(("b".to_string(), Value::Integer(2))));
    }

    #[test]
    fn truncated_input_reports_position() {
        let err = parser("{\"a\": ").parse_value().unwrap_err();
        assert!(err.position().is_some());
    }
}
