#![deny(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! Bounded-memory, pull-style streaming JSON.
//!
//! A document is read through a chunked [`byte_source::ByteSource`], scanned
//! into tokens by [`lexer::Lexer`], and turned into values by [`parser::Parser`].
//! Arrays and objects can be materialized whole via [`reader::StreamReader::read_all`]
//! or walked lazily via [`reader::StreamReader::array`] / [`reader::StreamReader::object`]
//! without ever holding more than one container's worth of state in memory.
//!
//! A document can also be narrowed with a JSONPath-subset expression
//! (see [`path`]) before anything is materialized, so large documents can be
//! filtered down to the handful of values a caller actually wants.

mod byte_source;
pub mod config;
pub mod error;
mod lexer;
mod parser;
pub mod path;
mod reader;
mod token;
pub mod value;

pub use config::ReaderConfig;
pub use error::{Error, Position, Result};
pub use path::{PathEvaluator, PathExpression, PathFilter, PathParser, PathSegment};
pub use reader::{ArrayIterator, ItemIterator, ItemKind, ObjectIterator, StreamReader};
pub use value::{JsonObject, Value};
