/// A growable token accumulator used by the header parser.
///
/// Bytes are appended one token at a time and stay put across `consume`
/// calls, so a token split over several reads is never re-scanned. The text
/// form is materialized once and cached until the next `clear`.
#[derive(Debug)]
pub struct ParseBuffer {
    data: Vec<u8>,
    count: usize,
    text: Option<String>,
}

impl ParseBuffer {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: vec![0; capacity], count: 0, text: None }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.ensure_capacity(self.count + 1);
        self.data[self.count] = byte;
        self.count += 1;
        self.text = None;
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.ensure_capacity(self.count + bytes.len());
        self.data[self.count..self.count + bytes.len()].copy_from_slice(bytes);
        self.count += bytes.len();
        self.text = None;
    }

    /// Grows to `max(2 * capacity, min)` when smaller than `min`, keeping the
    /// accumulated bytes.
    pub fn ensure_capacity(&mut self, min: usize) {
        if self.data.len() < min {
            let capacity = (self.data.len() * 2).max(min);
            self.data.resize(capacity, 0);
        }
    }

    /// Drops trailing spaces and tabs.
    pub fn trim_end(&mut self) {
        while self.count > 0 && matches!(self.data[self.count - 1], b' ' | b'\t') {
            self.count -= 1;
        }
        self.text = None;
    }

    /// Empties the buffer, the capacity is kept.
    pub fn clear(&mut self) {
        self.count = 0;
        self.text = None;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.count]
    }

    /// The accumulated bytes as text, invalid UTF-8 is replaced.
    pub fn text(&mut self) -> &str {
        let data = &self.data[..self.count];
        self.text.get_or_insert_with(|| String::from_utf8_lossy(data).into_owned())
    }
}

impl Default for ParseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_doubling() {
        let mut buffer = ParseBuffer::with_capacity(4);
        buffer.extend_from_slice(b"abcd");
        assert_eq!(buffer.capacity(), 4);

        buffer.push(b'e');
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.as_bytes(), b"abcde");

        buffer.extend_from_slice(&[b'x'; 20]);
        assert_eq!(buffer.capacity(), 25);
        assert!(buffer.len() <= buffer.capacity());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buffer = ParseBuffer::with_capacity(2);
        buffer.extend_from_slice(b"keep-alive");
        let capacity = buffer.capacity();

        assert_eq!(buffer.text(), "keep-alive");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), capacity);
        assert_eq!(buffer.text(), "");
    }

    #[test]
    fn text_is_refreshed_after_push() {
        let mut buffer = ParseBuffer::new();
        buffer.extend_from_slice(b"text/html  ");
        assert_eq!(buffer.text(), "text/html  ");

        buffer.trim_end();
        assert_eq!(buffer.text(), "text/html");

        buffer.push(b';');
        assert_eq!(buffer.text(), "text/html;");
    }
}
