//! The public streaming-reader façade: factory constructors, iterator
//! views, and path-directed `read_all`.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::config::ReaderConfig;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::byte_source::ByteSource;
use crate::parser::Parser;
use crate::path::{PathEvaluator, PathFilter, PathParser};
use crate::token::TokenKind;
use crate::value::Value;

/// Reads JSON from a byte stream in bounded memory, optionally narrowed to
/// the matches of a JSONPath-subset expression.
///
/// A `StreamReader` owns exactly one byte stream at a time. Reconfiguring
/// (`with_config`) produces a new reader that takes over that ownership;
/// the original becomes inert. This mirrors the "exactly one live owner"
/// rule documented on the configuration type.
pub struct StreamReader<R> {
    parser: Parser<R>,
    config: ReaderConfig,
    items_processed: u64,
}

impl StreamReader<Cursor<Vec<u8>>> {
    /// Reads from an in-memory string.
    pub fn from_str(input: impl Into<String>) -> Result<Self> {
        Self::from_bytes(input.into().into_bytes())
    }

    /// Reads from an in-memory byte buffer.
    pub fn from_bytes(input: Vec<u8>) -> Result<Self> {
        Self::with_config(Cursor::new(input), ReaderConfig::default())
    }
}

impl StreamReader<File> {
    /// Opens a file path for streaming.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io_with_path(e.to_string(), path))?;
        Self::with_config(file, ReaderConfig::default())
    }
}

impl<R: Read> StreamReader<R> {
    /// Wraps an arbitrary byte stream with the default configuration.
    pub fn from_stream(stream: R) -> Result<Self> {
        Self::with_config(stream, ReaderConfig::default())
    }

    /// Builds a reader over `stream` using an explicit configuration.
    pub fn with_config(stream: R, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        let source = ByteSource::new(stream, config.buffer_size())?;
        let lexer = Lexer::new(source);
        let parser = Parser::new(lexer, config.max_depth());
        Ok(Self {
            parser,
            config,
            items_processed: 0,
        })
    }

    /// Reconfigures this reader, transferring byte-stream ownership into a
    /// fresh instance built from `config`. `self` is consumed, so there is
    /// no way to keep using the original reader afterward; the compiler
    /// enforces the "exactly one live owner" rule rather than an inert
    /// runtime flag. Any bytes already buffered ahead of the last yielded
    /// token are discarded along with the old parser state.
    pub fn reconfigure(self, config: ReaderConfig) -> Result<Self> {
        let stream = self.parser.into_inner();
        Self::with_config(stream, config)
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Number of top-level items yielded so far across all iteration and
    /// `read_all` calls on this reader.
    pub fn items_processed(&self) -> u64 {
        self.items_processed
    }

    /// Returns the first path match (if a path is configured), the single
    /// decoded value otherwise, or `Value::Null` if a path is configured
    /// but nothing matched.
    pub fn read_all(&mut self) -> Result<Value> {
        match self.config.path().map(|p| p.to_string()) {
            Some(path) => {
                let matches = self.read_all_matches(&path)?;
                Ok(matches.into_iter().next().unwrap_or(Value::Null))
            }
            None => {
                let value = self.parser.parse_value()?;
                self.items_processed += 1;
                Ok(value)
            }
        }
    }

    /// Returns every match of `path` against the document.
    pub fn read_all_matches(&mut self, path: &str) -> Result<Vec<Value>> {
        let expr = PathParser::new(path).parse()?;
        let evaluator = PathEvaluator::new(expr);

        if evaluator.can_use_simple_streaming() {
            let mut out = Vec::new();
            self.parser.stream_path_matches(&evaluator, |value| {
                out.push(value);
                Ok(())
            })?;
            self.items_processed += out.len() as u64;
            Ok(out)
        } else {
            let root = self.parser.parse_value()?;
            let matches = PathFilter::new(evaluator.expression())
                .evaluate(&root)
                .into_iter()
                .cloned()
                .collect::<Vec<_>>();
            self.items_processed += matches.len() as u64;
            Ok(matches)
        }
    }

    /// Dispatches on the first structural token to obtain the appropriate
    /// streaming view of the document: objects and arrays stream their
    /// members/elements, a bare scalar yields exactly one null-keyed item.
    pub fn items(&mut self) -> Result<ItemIterator<'_, R>> {
        match self.parser.peek_kind()? {
            TokenKind::LBrace => Ok(ItemIterator::Object(self.object()?)),
            TokenKind::LBracket => Ok(ItemIterator::Array(self.array()?)),
            _ => Ok(ItemIterator::Scalar { reader: self, done: false }),
        }
    }

    /// Streams the document as an array. Fails if the document's first
    /// structural token is not `[`.
    pub fn array(&mut self) -> Result<ArrayIterator<'_, R>> {
        let has_element = self.parser.begin_array()?;
        Ok(ArrayIterator {
            reader: self,
            first: true,
            has_element,
            index: 0,
        })
    }

    /// Streams the document as an object. Fails if the document's first
    /// structural token is not `{`.
    pub fn object(&mut self) -> Result<ObjectIterator<'_, R>> {
        let has_member = self.parser.begin_object()?;
        Ok(ObjectIterator {
            reader: self,
            first: true,
            has_member,
        })
    }
}

impl<R: Read + Seek> StreamReader<R> {
    /// Rewinds a seekable underlying stream to the start and resets parser
    /// state, allowing the same reader to be iterated again.
    pub fn reset(&mut self) -> Result<()> {
        self.parser.reset()?;
        self.items_processed = 0;
        Ok(())
    }
}

/// Lazily yields the elements of a streamed JSON array.
pub struct ArrayIterator<'r, R> {
    reader: &'r mut StreamReader<R>,
    first: bool,
    has_element: bool,
    index: usize,
}

impl<'r, R: Read> ArrayIterator<'r, R> {
    /// Skips the next `n` elements without materializing them.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            if self.next_raw()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Collects at most `n` more elements.
    pub fn limit(&mut self, n: usize) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            match self.next_value()? {
                Some(value) => out.push(value),
                None => break,
            }
        }
        Ok(out)
    }

    /// Materializes every remaining element.
    pub fn to_array(&mut self) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        while let Some(value) = self.next_value()? {
            out.push(value);
        }
        Ok(out)
    }

    /// Always -1: element count is unknown until the array is exhausted.
    pub fn count_hint(&self) -> i64 {
        -1
    }

    fn next_value(&mut self) -> Result<Option<Value>> {
        if !self.has_element {
            return Ok(None);
        }
        let first = self.first;
        self.first = false;
        let value = self.reader.parser.next_array_element(first)?;
        if value.is_some() {
            self.index += 1;
            self.reader.items_processed += 1;
        } else {
            self.has_element = false;
        }
        Ok(value)
    }

    fn next_raw(&mut self) -> Result<Option<()>> {
        self.next_value().map(|v| v.map(|_| ()))
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<'r, R: Read> Iterator for ArrayIterator<'r, R> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}

/// Lazily yields the `(key, value)` members of a streamed JSON object.
pub struct ObjectIterator<'r, R> {
    reader: &'r mut StreamReader<R>,
    first: bool,
    has_member: bool,
}

impl<'r, R: Read> ObjectIterator<'r, R> {
    fn next_member(&mut self) -> Result<Option<(String, Value)>> {
        if !self.has_member {
            return Ok(None);
        }
        let first = self.first;
        self.first = false;
        let member = self.reader.parser.next_object_member(first)?;
        if member.is_some() {
            self.reader.items_processed += 1;
        } else {
            self.has_member = false;
        }
        Ok(member)
    }

    /// Advances the stream until `key` is found (returning its value) or
    /// the object is exhausted.
    pub fn get(&mut self, key: &str, default: Value) -> Result<Value> {
        while let Some((found_key, value)) = self.next_member()? {
            if found_key == key {
                return Ok(value);
            }
        }
        Ok(default)
    }

    /// Advances the stream until `key` is found or the object is exhausted.
    pub fn has(&mut self, key: &str) -> Result<bool> {
        while let Some((found_key, _)) = self.next_member()? {
            if found_key == key {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<'r, R: Read> Iterator for ObjectIterator<'r, R> {
    type Item = Result<(String, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_member().transpose()
    }
}

/// The element type a document/sub-document turned out to be, used by
/// [`ItemIterator`] to classify each yielded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
}

/// Dispatches on the document's first structural token: objects and arrays
/// stream their members/elements, a bare scalar yields exactly one
/// null-keyed item.
pub enum ItemIterator<'r, R> {
    Object(ObjectIterator<'r, R>),
    Array(ArrayIterator<'r, R>),
    Scalar { reader: &'r mut StreamReader<R>, done: bool },
}

impl<'r, R: Read> ItemIterator<'r, R> {
    fn next_item(&mut self) -> Result<Option<(Option<String>, Value, ItemKind)>> {
        match self {
            ItemIterator::Object(obj) => Ok(obj.next_member()?.map(|(key, value)| {
                let kind = classify(&value);
                (Some(key), value, kind)
            })),
            ItemIterator::Array(arr) => Ok(arr.next_value()?.map(|value| {
                let kind = classify(&value);
                (None, value, kind)
            })),
            ItemIterator::Scalar { reader, done } => {
                if *done {
                    return Ok(None);
                }
                *done = true;
                let value = reader.read_all()?;
                let kind = classify(&value);
                Ok(Some((None, value, kind)))
            }
        }
    }
}

fn classify(value: &Value) -> ItemKind {
    match value {
        Value::String(_) => ItemKind::String,
        Value::Integer(_) | Value::Float(_) => ItemKind::Number,
        Value::Bool(_) => ItemKind::Boolean,
        Value::Null => ItemKind::Null,
        Value::Array(_) => ItemKind::Array,
        Value::Object(_) => ItemKind::Object,
    }
}

impl<'r, R: Read> Iterator for ItemIterator<'r, R> {
    type Item = Result<(Option<String>, Value, ItemKind)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_all_without_path_returns_whole_document() {
        let mut reader = StreamReader::from_str(r#"{"a": 1}"#).unwrap();
        let value = reader.read_all().unwrap();
        assert_eq!(value.as_object().unwrap().get("a"), Some(&Value::Integer(1)));
        assert_eq!(reader.items_processed(), 1);
    }

    #[test]
    fn array_iterator_tracks_index() {
        let mut reader = StreamReader::from_str("[10, 20, 30]").unwrap();
        let mut arr = reader.array().unwrap();
        let values: Vec<_> = arr.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(values, vec![Value::Integer(10), Value::Integer(20), Value::Integer(30)]);
        assert_eq!(arr.index(), 3);
        assert_eq!(arr.count_hint(), -1);
    }

    #[test]
    fn simple_streaming_wildcard_does_not_materialize_outer_array() {
        let mut reader = StreamReader::from_str(r#"{"Ads": [{"id": 1}, {"id": 2}]}"#).unwrap();
        let matches = reader.read_all_matches("$.Ads[*]").unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn bounded_index_path_terminates_early() {
        let mut reader = StreamReader::from_str(r#"{"items": [1, 2, 3, 4, 5]}"#).unwrap();
        let matches = reader.read_all_matches("$.items[2]").unwrap();
        assert_eq!(matches, vec![Value::Integer(3)]);
    }

    #[test]
    fn slice_with_trailing_property() {
        let mut reader =
            StreamReader::from_str(r#"{"items": [{"v": 1}, {"v": 2}, {"v": 3}]}"#).unwrap();
        let matches = reader.read_all_matches("$.items[0:2].v").unwrap();
        assert_eq!(matches, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn truncated_input_reports_position() {
        let mut reader = StreamReader::from_str(r#"{"a": "#).unwrap();
        let err = reader.read_all().unwrap_err();
        assert!(err.position().is_some());
    }

    #[test]
    fn object_iterator_get_advances_until_found() {
        let mut reader = StreamReader::from_str(r#"{"a": 1, "b": 2, "c": 3}"#).unwrap();
        let mut obj = reader.object().unwrap();
        assert_eq!(obj.get("b", Value::Null).unwrap(), Value::Integer(2));
    }

    #[test]
    fn item_iterator_classifies_scalar_document() {
        let mut reader = StreamReader::from_str("42").unwrap();
        let mut items = reader.items().unwrap();
        let (key, value, kind) = items.next().unwrap().unwrap();
        assert_eq!(key, None);
        assert_eq!(value, Value::Integer(42));
        assert_eq!(kind, ItemKind::Number);
    }
}
