use bytes::{Bytes, BytesMut};

use crate::codec::Sender;
use crate::ensure;
use crate::protocol::SendError;

/// Buffers outgoing bytes until the connection writes them to the socket.
///
/// `flush` and `close` only record the request; the connection acts on
/// them after draining the buffer.
#[derive(Debug)]
pub struct ConnectionSender {
    buffer: BytesMut,
    flush: bool,
    closed: bool,
}

impl ConnectionSender {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(capacity), flush: false, closed: false }
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Takes the buffered bytes.
    pub fn take(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Whether a flush was requested since the last call.
    pub fn take_flush(&mut self) -> bool {
        std::mem::take(&mut self.flush)
    }
}

impl Default for ConnectionSender {
    fn default() -> Self {
        Self::with_capacity(8 * 1024)
    }
}

impl Sender for ConnectionSender {
    fn send(&mut self, data: &[u8]) -> Result<(), SendError> {
        ensure!(!self.closed, SendError::Closed);
        self.buffer.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SendError> {
        self.flush = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SendError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_until_taken() {
        let mut sender = ConnectionSender::default();
        sender.send(b"HTTP/1.1 200 OK\r\n").unwrap();
        sender.send(b"\r\n").unwrap();
        sender.flush().unwrap();

        assert_eq!(sender.pending(), 19);
        assert!(sender.take_flush());
        assert!(!sender.take_flush());
        assert_eq!(&sender.take()[..], b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(sender.pending(), 0);
    }

    #[test]
    fn closed_sender_keeps_buffered_bytes() {
        let mut sender = ConnectionSender::default();
        sender.send(b"last").unwrap();
        sender.close().unwrap();

        assert!(matches!(sender.send(b"more"), Err(SendError::Closed)));
        assert!(sender.is_closed());
        assert_eq!(&sender.take()[..], b"last");
    }
}
