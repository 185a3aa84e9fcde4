//! Crate error type.
//!
//! `streamjson` exposes a single [`Error`] enum covering every failure mode the
//! core can raise: unreadable byte sources, malformed JSON, malformed path
//! expressions, and caller misuse of the façade. Every fallible function in
//! this crate returns [`Result<T>`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A 1-based source position, attached to every [`Error::Parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// The crate's single error type.
///
/// The four kinds from the error taxonomy map one-to-one onto variants here;
/// every caller can match on kind without needing to know which subsystem
/// raised it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The underlying byte source could not be read, opened, seeked, or
    /// configured.
    #[error("io error: {message}{}", path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    /// A lex-level or parse-level malformation of the JSON grammar.
    #[error("parse error at {position}: {message}")]
    Parse { message: String, position: Position },

    /// A malformed JSONPath-subset expression was given to the compiler.
    #[error("invalid path expression {path:?}: {message}")]
    Path { message: String, path: String },

    /// Programmer misuse at the façade: wrong input type, invalid
    /// configuration value, or similar non-resource, non-parse failure.
    #[error("invalid argument: {message}")]
    Argument { message: String },
}

impl Error {
    pub fn io(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
            path: None,
        }
    }

    pub fn io_with_path(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Error::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn parse(message: impl Into<String>, position: Position) -> Self {
        Error::Parse {
            message: message.into(),
            position,
        }
    }

    pub fn path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Error::Path {
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Error::Argument {
            message: message.into(),
        }
    }

    /// The 1-based source position, when this is a [`Error::Parse`].
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::Parse { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_position() {
        let err = Error::parse("Unexpected character", Position::new(3, 7));
        assert_eq!(err.position(), Some(Position::new(3, 7)));
        assert!(err.to_string().contains("line 3, column 7"));
    }

    #[test]
    fn io_error_without_path_omits_suffix() {
        let err = Error::io("stream closed");
        assert_eq!(err.to_string(), "io error: stream closed");
    }

    #[test]
    fn io_error_with_path_includes_it() {
        let err = Error::io_with_path("no such file", "/tmp/data.json");
        assert!(err.to_string().contains("/tmp/data.json"));
    }

    #[test]
    fn non_parse_errors_have_no_position() {
        assert_eq!(Error::argument("bad input").position(), None);
        assert_eq!(Error::path("empty path", "").position(), None);
    }
}
