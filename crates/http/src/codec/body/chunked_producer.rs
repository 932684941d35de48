//! Chunked transfer encoding of response bodies,
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).

use tracing::trace;

use super::{Observer, Producer, Sender};
use crate::ensure;
use crate::protocol::SendError;

const HEX: &[u8; 16] = b"0123456789abcdef";

const LAST_CHUNK: &[u8] = b"0\r\n\r\n";

/// Writes every `produce` call as one chunk.
///
/// The size line is rendered backwards into a fixed scratch of eight hex
/// digits followed by CRLF, the CRLF doubles as the chunk trailer.
#[derive(Debug)]
pub struct ChunkedProducer<'a, S: Sender> {
    sender: &'a mut S,
    observer: &'a dyn Observer,
    size: [u8; 10],
}

impl<'a, S: Sender> ChunkedProducer<'a, S> {
    pub fn new(sender: &'a mut S, observer: &'a dyn Observer) -> Self {
        Self { sender, observer, size: *b"00000000\r\n" }
    }

    pub fn sender_mut(&mut self) -> &mut S {
        self.sender
    }

    /// Renders `len` as hex ending at index 7, returns the first digit's index.
    fn size_line(&mut self, len: u32) -> usize {
        let mut start = 8;
        let mut num = len;
        while num > 0 {
            start -= 1;
            self.size[start] = HEX[(num & 0xf) as usize];
            num >>= 4;
        }
        start
    }

    fn send_chunk(&mut self, start: usize, data: &[u8]) -> Result<(), SendError> {
        self.sender.send(&self.size[start..])?;
        self.sender.send(data)?;
        self.sender.send(&self.size[8..])
    }
}

impl<S: Sender> Producer for ChunkedProducer<'_, S> {
    fn produce(&mut self, data: &[u8]) -> Result<(), SendError> {
        if data.is_empty() {
            return Ok(());
        }
        ensure!(!self.observer.is_closed(), SendError::Closed);

        let Ok(len) = u32::try_from(data.len()) else {
            self.observer.error(&mut *self.sender);
            return Err(SendError::ChunkTooLarge { size: data.len() });
        };

        let start = self.size_line(len);
        if let Err(e) = self.send_chunk(start, data) {
            self.observer.error(&mut *self.sender);
            return Err(e);
        }
        trace!(len, "sent chunk");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SendError> {
        if self.observer.is_closed() {
            return Ok(());
        }
        if let Err(e) = self.sender.flush() {
            self.observer.close(&mut *self.sender);
            return Err(e);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SendError> {
        if self.observer.is_closed() {
            return Ok(());
        }
        if let Err(e) = self.sender.send(LAST_CHUNK) {
            self.observer.close(&mut *self.sender);
            return Err(e);
        }
        self.observer.ready(&mut *self.sender);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::body::ChunkedDecoder;
    use crate::codec::testing::RecordingSender;
    use crate::connection::ResponseObserver;
    use bytes::BytesMut;
    use tokio_util::codec::Decoder;

    fn decode(encoded: &[u8]) -> Vec<u8> {
        let mut buffer = BytesMut::from(encoded);
        let mut decoder = ChunkedDecoder::new();
        let mut body = Vec::new();
        while let Some(item) = decoder.decode(&mut buffer).unwrap() {
            match item.into_bytes() {
                Some(bytes) => body.extend_from_slice(&bytes),
                None => break,
            }
        }
        assert!(buffer.is_empty(), "trailing bytes after the last chunk");
        body
    }

    #[test]
    fn three_sends_per_chunk() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = ChunkedProducer::new(&mut sender, &observer);

        producer.produce(b"hello world").unwrap();
        producer.close().unwrap();

        assert_eq!(sender.frames, vec![b"b\r\n".to_vec(), b"hello world".to_vec(), b"\r\n".to_vec(), b"0\r\n\r\n".to_vec()]);
        assert!(observer.is_ready());
    }

    #[test]
    fn sizes_decode_back() {
        for size in [0usize, 1, 4095, 4096, 65536] {
            let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            let observer = ResponseObserver::new();
            let mut sender = RecordingSender::default();
            let mut producer = ChunkedProducer::new(&mut sender, &observer);

            producer.produce(&data).unwrap();
            producer.close().unwrap();
            producer.close().unwrap();

            let encoded = sender.bytes();
            assert!(encoded.ends_with(b"0\r\n\r\n"));
            assert_eq!(encoded.windows(5).filter(|w| w == b"0\r\n\r\n").count(), 1, "size {size}");
            assert_eq!(decode(&encoded), data, "size {size}");
        }
    }

    #[test]
    fn size_line_is_lowercase_hex() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = ChunkedProducer::new(&mut sender, &observer);

        producer.produce(&[b'x'; 0xabc]).unwrap();
        producer.produce(b"x").unwrap();

        assert_eq!(sender.frames[0], b"abc\r\n");
        assert_eq!(sender.frames[3], b"1\r\n");
    }

    #[test]
    fn closed_response_refuses_bytes() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = ChunkedProducer::new(&mut sender, &observer);

        producer.close().unwrap();
        assert!(matches!(producer.produce(b"late"), Err(SendError::Closed)));
        assert!(producer.produce(b"").is_ok());
        assert_eq!(sender.frames.len(), 1);
    }

    #[test]
    fn send_failure_signals_error() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::failing_after(1);
        let mut producer = ChunkedProducer::new(&mut sender, &observer);

        assert!(producer.produce(b"data").is_err());
        assert!(observer.is_error());
        assert!(sender.closed);
    }
}
