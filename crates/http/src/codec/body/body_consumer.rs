//! Collects a request body from a [`ByteCursor`] before the request is
//! dispatched.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use super::PayloadDecoder;
use crate::codec::consumer::{CHUNK_SIZE, Consumer};
use crate::ensure;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use crate::transport::ByteCursor;

/// Default limit of a collected request body.
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Buffers a whole request body, fixed length or chunked.
///
/// Bytes read past the end of the body belong to the next pipelined request
/// and are pushed back onto the cursor.
#[derive(Debug)]
pub struct BodyConsumer {
    decoder: PayloadDecoder,
    staging: BytesMut,
    body: BytesMut,
    received: u64,
    limit: u64,
    finished: bool,
}

impl BodyConsumer {
    /// # Errors
    ///
    /// A declared `Content-Length` above `limit` is refused before any byte is read.
    pub fn new(size: PayloadSize, limit: u64) -> Result<Self, ParseError> {
        let capacity = match size {
            PayloadSize::Length(length) => {
                ensure!(length <= limit, ParseError::too_large_body(length, limit));
                usize::try_from(length).unwrap_or(CHUNK_SIZE)
            }
            PayloadSize::Chunked => CHUNK_SIZE,
            PayloadSize::Empty => 0,
        };

        Ok(Self {
            decoder: PayloadDecoder::from(size),
            staging: BytesMut::new(),
            body: BytesMut::with_capacity(capacity),
            received: 0,
            limit,
            finished: false,
        })
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// The bytes collected so far, the whole body once finished.
    pub fn take_body(&mut self) -> Bytes {
        self.body.split().freeze()
    }

    /// Runs the decoder over the staged bytes, true once the body ended.
    fn drain<C: ByteCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<bool, ParseError> {
        while let Some(item) = self.decoder.decode(&mut self.staging)? {
            match item {
                PayloadItem::Chunk(bytes) => {
                    self.received += bytes.len() as u64;
                    ensure!(self.received <= self.limit, ParseError::too_large_body(self.received, self.limit));
                    self.body.extend_from_slice(&bytes);
                }
                PayloadItem::Eof => {
                    if !self.staging.is_empty() {
                        trace!(len = self.staging.len(), "push back bytes of the next request");
                        cursor.push(&self.staging.split());
                    }
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

impl Consumer for BodyConsumer {
    fn consume<C: ByteCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<(), ParseError> {
        let mut chunk = [0u8; CHUNK_SIZE];

        while !self.finished {
            if self.drain(cursor)? {
                self.finished = true;
                trace!(size = self.received, "request body collected");
                break;
            }

            let count = cursor.read(&mut chunk).map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => ParseError::Closed,
                _ => ParseError::io(e),
            })?;
            if count == 0 {
                break;
            }
            self.staging.extend_from_slice(&chunk[..count]);
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferCursor;

    #[test]
    fn fixed_length_across_reads() {
        let mut cursor = BufferCursor::from(&b"hel"[..]);
        let mut consumer = BodyConsumer::new(PayloadSize::Length(5), MAX_BODY_BYTES).unwrap();

        consumer.consume(&mut cursor).unwrap();
        assert!(!consumer.is_finished());

        cursor.extend_from_slice(b"loGET / HTTP/1.1\r\n");
        consumer.consume(&mut cursor).unwrap();
        assert!(consumer.is_finished());
        assert_eq!(&consumer.take_body()[..], b"hello");
        assert_eq!(&cursor.buffer()[..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn chunked_pushes_back_next_request() {
        let mut cursor = BufferCursor::from(&b"4\r\nwire\r\n5\r\n-http\r\n0\r\n\r\nGET /next HTTP/1.1\r\n"[..]);
        let mut consumer = BodyConsumer::new(PayloadSize::Chunked, MAX_BODY_BYTES).unwrap();

        consumer.consume(&mut cursor).unwrap();
        assert!(consumer.is_finished());
        assert_eq!(consumer.received(), 9);
        assert_eq!(&consumer.take_body()[..], b"wire-http");
        assert_eq!(&cursor.buffer()[..], b"GET /next HTTP/1.1\r\n");
    }

    #[test]
    fn empty_body_reads_nothing() {
        let mut cursor = BufferCursor::from(&b"GET / HTTP/1.1\r\n"[..]);
        let mut consumer = BodyConsumer::new(PayloadSize::Empty, MAX_BODY_BYTES).unwrap();

        consumer.consume(&mut cursor).unwrap();
        assert!(consumer.is_finished());
        assert!(consumer.take_body().is_empty());
        assert_eq!(cursor.ready(), 16);
    }

    #[test]
    fn limits_are_enforced() {
        let error = BodyConsumer::new(PayloadSize::Length(11), 10).unwrap_err();
        assert!(matches!(error, ParseError::TooLargeBody { current_size: 11, max_size: 10 }));

        let mut cursor = BufferCursor::from(&b"6\r\nabcdef\r\n6\r\nghijkl\r\n0\r\n\r\n"[..]);
        let mut consumer = BodyConsumer::new(PayloadSize::Chunked, 10).unwrap();
        assert!(matches!(consumer.consume(&mut cursor), Err(ParseError::TooLargeBody { .. })));
    }

    #[test]
    fn closed_cursor_is_fatal() {
        let mut cursor = BufferCursor::from(&b"abc"[..]);
        cursor.close();
        let mut consumer = BodyConsumer::new(PayloadSize::Length(5), MAX_BODY_BYTES).unwrap();
        assert!(matches!(consumer.consume(&mut cursor), Err(ParseError::Closed)));
    }
}
