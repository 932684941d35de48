//! Pull based byte sources consumed by the parsers.

use bytes::{Buf, BytesMut};
use std::io;

/// A non-blocking, re-seekable source of bytes.
///
/// `read` never waits: it copies whatever is currently buffered and may
/// return `Ok(0)`. Bytes read too far can be handed back with `push`, the
/// next `read` returns them first.
pub trait ByteCursor {
    /// Whether more bytes may still arrive.
    fn is_open(&self) -> bool;

    /// Number of bytes that can be read without waiting.
    fn ready(&self) -> usize;

    /// Copies up to `data.len()` buffered bytes into `data`.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] once the cursor is closed
    /// and drained.
    fn read(&mut self, data: &mut [u8]) -> io::Result<usize>;

    /// Un-consumes `data`, it becomes the head of the cursor.
    fn push(&mut self, data: &[u8]);

    /// Marks the cursor closed, buffered bytes remain readable.
    fn close(&mut self);

    #[inline]
    fn is_ready(&self) -> bool {
        self.ready() > 0
    }
}

/// A [`ByteCursor`] over a `BytesMut` that the connection fills from the socket.
///
/// Reads move `position` forward without releasing the bytes, so pushing
/// back what was just read only moves it back.
#[derive(Debug)]
pub struct BufferCursor {
    buffer: BytesMut,
    position: usize,
    open: bool,
}

impl BufferCursor {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: BytesMut::with_capacity(capacity), position: 0, open: true }
    }

    /// The unread bytes, socket reads append to them directly.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        self.compact();
        &mut self.buffer
    }

    /// The unread bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer[self.position..]
    }

    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.compact();
        self.buffer.extend_from_slice(data);
    }

    /// Releases the bytes already read.
    fn compact(&mut self) {
        self.buffer.advance(self.position);
        self.position = 0;
    }
}

impl Default for BufferCursor {
    fn default() -> Self {
        Self::with_capacity(8 * 1024)
    }
}

impl From<&[u8]> for BufferCursor {
    fn from(data: &[u8]) -> Self {
        let mut cursor = Self::with_capacity(data.len());
        cursor.extend_from_slice(data);
        cursor
    }
}

impl ByteCursor for BufferCursor {
    fn is_open(&self) -> bool {
        self.open
    }

    fn ready(&self) -> usize {
        self.buffer.len() - self.position
    }

    fn read(&mut self, data: &mut [u8]) -> io::Result<usize> {
        let unread = &self.buffer[self.position..];
        if unread.is_empty() {
            return if self.open { Ok(0) } else { Err(io::ErrorKind::UnexpectedEof.into()) };
        }

        let count = data.len().min(unread.len());
        data[..count].copy_from_slice(&unread[..count]);
        self.position += count;
        Ok(count)
    }

    fn push(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        // the common case hands back the tail of the last read
        if let Some(start) = self.position.checked_sub(data.len())
            && self.buffer[start..self.position] == *data
        {
            self.position = start;
            return;
        }

        self.compact();
        let mut joined = BytesMut::with_capacity(data.len() + self.buffer.len());
        joined.extend_from_slice(data);
        joined.extend_from_slice(&self.buffer);
        self.buffer = joined;
    }

    fn close(&mut self) {
        self.open = false;
    }
}
