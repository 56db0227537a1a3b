//! Decoder for the chunked transfer coding.
//!
//! ```text
//!   Size ──(n > 0)──► Data(n) ──► DataEnd ──► Size
//!     │
//!     └──(n == 0)──► Trailer ──(blank line)──► Done
//! ```

use std::io::{self, BufRead, Read, Write};

use tracing::trace;

use crate::error::{HttpError, Result, SocketError};

use super::parser::read_line;

/// Longest chunk-size or trailer line accepted.
const MAX_LINE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    /// Expecting a chunk-size line.
    Size,
    /// Copying a chunk with this many bytes left.
    Data(u64),
    /// Expecting the CRLF after chunk data.
    DataEnd,
    /// Reading trailer fields after the last chunk.
    Trailer,
    Done,
}

#[derive(Debug)]
pub struct ChunkedDecoder {
    state: ChunkState,
    decoded: u64,
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: ChunkState::Size,
            decoded: 0,
        }
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Body bytes written to the sink so far.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Decodes the whole body from `reader` into `sink` and returns its
    /// length. A bad chunk-size line fails with `malformed_response` before
    /// anything past that line is read.
    pub fn decode<R, W>(&mut self, reader: &mut R, sink: &mut W) -> Result<u64>
    where
        R: BufRead + ?Sized,
        W: Write + ?Sized,
    {
        loop {
            match self.state {
                ChunkState::Size => {
                    let line = next_line(reader)?;
                    let size = parse_chunk_size(&line)?;
                    trace!(size, "chunk");
                    self.state = if size == 0 {
                        ChunkState::Trailer
                    } else {
                        ChunkState::Data(size)
                    };
                }
                ChunkState::Data(remaining) => {
                    let copied = io::copy(&mut (&mut *reader).take(remaining), sink)?;
                    self.decoded += copied;
                    if copied < remaining {
                        self.state = ChunkState::Data(remaining - copied);
                        return Err(SocketError::Eof.into());
                    }
                    self.state = ChunkState::DataEnd;
                }
                ChunkState::DataEnd => {
                    if !next_line(reader)?.is_empty() {
                        return Err(HttpError::MalformedResponse.into());
                    }
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailer => {
                    // trailer fields are not surfaced
                    if next_line(reader)?.is_empty() {
                        self.state = ChunkState::Done;
                    }
                }
                ChunkState::Done => return Ok(self.decoded),
            }
        }
    }
}

fn next_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<String> {
    let mut budget = MAX_LINE;
    read_line(reader, &mut budget)?.ok_or_else(|| SocketError::Eof.into())
}

/// Hex chunk size, ignoring any `;extension`.
fn parse_chunk_size(line: &str) -> Result<u64> {
    let digits = line.split(';').next().unwrap_or("").trim();
    if digits.is_empty() {
        return Err(HttpError::MalformedResponse.into());
    }
    u64::from_str_radix(digits, 16).map_err(|_| HttpError::MalformedResponse.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunk_size_ignores_extensions() {
        assert_eq!(parse_chunk_size("1a;name=value").unwrap(), 26);
        assert_eq!(parse_chunk_size("FF").unwrap(), 255);
        assert_eq!(parse_chunk_size(" 0 ").unwrap(), 0);
    }

    #[test]
    fn chunk_size_rejects_garbage() {
        assert!(parse_chunk_size("").is_err());
        assert!(parse_chunk_size(";ext").is_err());
        assert!(parse_chunk_size("0x10").is_err());
        assert!(parse_chunk_size("ZZZ").is_err());
    }

    #[test]
    fn truncated_chunk_reports_eof() {
        let mut input = Cursor::new(b"8\r\nabc".to_vec());
        let mut out = Vec::new();
        let mut decoder = ChunkedDecoder::new();
        let err = decoder.decode(&mut input, &mut out).unwrap_err();
        assert!(err.is_eof());
        assert_eq!(out, b"abc");
        assert_eq!(decoder.state(), ChunkState::Data(5));
    }

    #[test]
    fn missing_crlf_after_data_is_malformed() {
        let mut input = Cursor::new(b"3\r\nabcX\r\n0\r\n\r\n".to_vec());
        let mut out = Vec::new();
        let err = ChunkedDecoder::new().decode(&mut input, &mut out).unwrap_err();
        assert!(matches!(err, crate::error::Error::Http(HttpError::MalformedResponse)));
    }
}
