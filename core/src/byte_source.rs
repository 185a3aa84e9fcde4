//! Chunked byte source with peek-across-refill semantics.
//!
//! [`ByteSource`] amortizes small reads over a fixed-size internal buffer and
//! exposes single-byte lookahead that may legally cross a refill boundary.
//! The refill-recomputation contract in [`ByteSource::peek`] is the one
//! historically documented regression in this family of readers: a large
//! array whose separating comma lands exactly at the edge of the first
//! buffer fill must still parse correctly, which requires recomputing the
//! peek offset relative to the buffer's cursor *after* a refill, not before.

use std::io::Read;

use crate::config::{MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
use crate::error::{Error, Result};

/// Chunked reader over any [`Read`] stream, with line/column tracking and
/// peek-ahead that survives internal buffer refills.
pub struct ByteSource<R> {
    reader: R,
    buf: Vec<u8>,
    /// Cursor into `buf`; bytes at `buf[..pos]` have been consumed.
    pos: usize,
    /// Number of valid bytes in `buf`.
    filled: usize,
    /// True once the underlying reader has reported EOF.
    reader_eof: bool,
    /// 0-based line of the next unread byte.
    line: usize,
    /// 0-based column of the next unread byte.
    column: usize,
}

impl<R: Read> ByteSource<R> {
    /// Builds a new source. `buffer_size` must fall within
    /// `[MIN_BUFFER_SIZE, MAX_BUFFER_SIZE]`.
    pub fn new(reader: R, buffer_size: usize) -> Result<Self> {
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&buffer_size) {
            return Err(Error::argument(format!(
                "buffer size {buffer_size} out of range [{MIN_BUFFER_SIZE}, {MAX_BUFFER_SIZE}]"
            )));
        }
        Ok(Self {
            reader,
            buf: vec![0u8; buffer_size],
            pos: 0,
            filled: 0,
            reader_eof: false,
            line: 0,
            column: 0,
        })
    }

    /// 0-based `(line, column)` of the next byte that would be returned by
    /// `read_byte`.
    pub fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// True only once the underlying stream is exhausted and the internal
    /// buffer has been fully consumed.
    pub fn is_eof(&self) -> bool {
        self.reader_eof && self.pos >= self.filled
    }

    /// Shifts any unconsumed bytes to the front of the buffer and reads more
    /// from the underlying stream to fill the remaining capacity. After this
    /// call `pos == 0`.
    fn refill(&mut self) -> Result<()> {
        if self.reader_eof {
            // Nothing more to fetch; collapse the unconsumed tail to the front
            // so callers relying on pos == 0 after refill stay correct.
            let remaining = self.filled - self.pos;
            self.buf.copy_within(self.pos..self.filled, 0);
            self.filled = remaining;
            self.pos = 0;
            return Ok(());
        }

        let remaining = self.filled - self.pos;
        self.buf.copy_within(self.pos..self.filled, 0);
        self.pos = 0;
        self.filled = remaining;

        while self.filled < self.buf.len() {
            let n = self.reader.read(&mut self.buf[self.filled..])?;
            if n == 0 {
                self.reader_eof = true;
                break;
            }
            self.filled += n;
        }
        Ok(())
    }

    fn advance_position(&mut self, byte: u8) {
        if byte == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    /// Reads and consumes one byte, or `None` at EOF.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.pos >= self.filled {
            self.refill()?;
            if self.pos >= self.filled {
                return Ok(None);
            }
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        self.advance_position(byte);
        Ok(Some(byte))
    }

    /// Looks at the byte `offset` positions ahead of the cursor without
    /// consuming it. `offset == 0` is the next unread byte.
    ///
    /// If the requested position lies beyond the currently filled region and
    /// EOF has not yet been reached, a single refill is attempted and the
    /// offset is recomputed relative to the buffer's cursor *after* that
    /// refill (which is always 0) before the final bounds check. A naive
    /// implementation that reuses the pre-refill cursor will silently return
    /// the wrong byte whenever the lookahead straddles a chunk boundary.
    pub fn peek(&mut self, offset: usize) -> Result<Option<u8>> {
        let target = self.pos + offset;
        if target < self.filled {
            return Ok(Some(self.buf[target]));
        }
        if self.is_eof() {
            return Ok(None);
        }
        self.refill()?;
        // pos is now 0 by construction of refill(); recompute against it.
        let target = self.pos + offset;
        if target < self.filled {
            Ok(Some(self.buf[target]))
        } else {
            Ok(None)
        }
    }

    /// Discards buffering state and hands back the underlying stream.
    pub(crate) fn into_inner(self) -> R {
        self.reader
    }

    /// Reads up to `n` bytes, looping over refills as needed. Returns fewer
    /// than `n` bytes only at EOF.
    pub fn read_chunk(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            match self.read_byte()? {
                Some(byte) => out.push(byte),
                None => break,
            }
        }
        Ok(out)
    }
}

impl<R: Read + std::io::Seek> ByteSource<R> {
    /// Repositions a seekable stream to byte 0 and clears all counters.
    pub fn reset(&mut self) -> Result<()> {
        self.reader.seek(std::io::SeekFrom::Start(0))?;
        self.pos = 0;
        self.filled = 0;
        self.reader_eof = false;
        self.line = 0;
        self.column = 0;
        Ok(())
    }
}
