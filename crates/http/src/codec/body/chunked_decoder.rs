//! Decoder for request bodies sent with chunked transfer encoding,
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Whitespace after the size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// Read LF after chunk size
    SizeLf,
    /// Read chunk data
    Body,
    /// Read CR after chunk data
    BodyCr,
    /// Read LF after chunk data
    BodyLf,
    /// Skip a trailer field
    Trailer,
    /// Read LF after trailer
    TrailerLf,
    /// Read final CR, or the start of a trailer
    EndCr,
    /// Read final LF
    EndLf,
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    /// - `Ok(Some(PayloadItem::Chunk(bytes)))` for chunk data, possibly a part of a chunk
    /// - `Ok(Some(PayloadItem::Eof))` once the last chunk and trailers are read
    /// - `Ok(None)` when more data is needed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                End => {
                    trace!("finished reading chunked data");
                    return Ok(Some(PayloadItem::Eof));
                }

                _ if src.is_empty() => return Ok(None),

                Body => {
                    let available = src.len();
                    let len = usize::try_from(self.remaining_size).map_or(available, |size| size.min(available));
                    self.remaining_size -= len as u64;
                    if self.remaining_size == 0 {
                        self.state = BodyCr;
                    }

                    trace!(len, "read chunked bytes");
                    return Ok(Some(PayloadItem::Chunk(src.split_to(len).freeze())));
                }

                state => {
                    let byte = src.get_u8();
                    self.state = self.next(state, byte)?;
                }
            }
        }
    }
}

impl ChunkedDecoder {
    fn next(&mut self, state: ChunkedState, byte: u8) -> Result<ChunkedState, ParseError> {
        let next = match (state, byte) {
            (Size, b'0'..=b'9' | b'a'..=b'f' | b'A'..=b'F') => {
                let digit = u64::from(char::from(byte).to_digit(16).unwrap_or_default());
                self.remaining_size = self
                    .remaining_size
                    .checked_mul(16)
                    .and_then(|size| size.checked_add(digit))
                    .ok_or_else(|| ParseError::invalid_body("invalid overflow chunked length"))?;
                Size
            }
            (Size | SizeLws, b'\t' | b' ') => SizeLws,
            (Size | SizeLws, b';') => Extension,
            (Size | SizeLws | Extension, b'\r') => SizeLf,
            // extensions end at CRLF, a bare LF is refused
            (Extension, b'\n') => return Err(ParseError::invalid_body("invalid chunk extension contains newline")),
            (Extension, _) => Extension,
            (SizeLf, b'\n') if self.remaining_size == 0 => EndCr,
            (SizeLf, b'\n') => Body,
            (BodyCr, b'\r') => BodyLf,
            (BodyLf, b'\n') => Size,
            (EndCr, b'\r') => EndLf,
            (Trailer, b'\r') => TrailerLf,
            (EndCr | Trailer, _) => Trailer,
            (TrailerLf, b'\n') => EndCr,
            (EndLf, b'\n') => End,
            (state, byte) => {
                return Err(ParseError::invalid_body(format!("unexpected byte 0x{byte:02x} while reading {state:?}")));
            }
        };
        Ok(next)
    }
}
