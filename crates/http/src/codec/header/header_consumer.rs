//! Incremental request header parser.
//!
//! The parser is a byte driven state machine over the request line and the
//! header fields. Every token accumulates in its own [`ParseBuffer`], so a
//! request split across any number of reads parses to the same header as
//! the request read in one go.

use std::mem;

use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use tracing::trace;

use super::ParseBuffer;
use crate::codec::consumer::{CHUNK_SIZE, Consumer};
use crate::ensure;
use crate::protocol::{ParseError, RequestHeader};
use crate::transport::ByteCursor;

/// Default limit of the request line plus header fields.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default limit of header fields per request.
pub const MAX_HEADERS: usize = 64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    /// Skipping empty lines before the request line
    Start,
    Method,
    Target,
    Version,
    /// Read LF after the request line
    VersionLf,
    /// First byte of a header line: a name, folding, or the blank line
    FieldStart,
    Name,
    /// Whitespace between the colon and the value
    ValueStart,
    Value,
    /// Read LF after a header value
    ValueLf,
    /// Whitespace opening a continuation line
    Folding,
    /// Read LF of the blank line
    EndLf,
    Done,
}

#[derive(Debug)]
pub struct HeaderConsumer {
    phase: Phase,
    method: ParseBuffer,
    target: ParseBuffer,
    version: ParseBuffer,
    name: ParseBuffer,
    value: ParseBuffer,
    pending: bool,
    protocol: (u8, u8),
    headers: HeaderMap,
    size: usize,
    max_header_bytes: usize,
    max_headers: usize,
    header: Option<RequestHeader>,
}

impl HeaderConsumer {
    pub fn new() -> Self {
        Self::with_limits(MAX_HEADER_BYTES, MAX_HEADERS)
    }

    pub fn with_limits(max_header_bytes: usize, max_headers: usize) -> Self {
        Self {
            phase: Phase::Start,
            method: ParseBuffer::with_capacity(8),
            target: ParseBuffer::with_capacity(64),
            version: ParseBuffer::with_capacity(8),
            name: ParseBuffer::with_capacity(32),
            value: ParseBuffer::with_capacity(64),
            pending: false,
            protocol: (1, 1),
            headers: HeaderMap::new(),
            size: 0,
            max_header_bytes,
            max_headers,
            header: None,
        }
    }

    /// Whether any byte of a request line has arrived.
    pub fn is_started(&self) -> bool {
        self.phase != Phase::Start
    }

    pub fn header(&self) -> Option<&RequestHeader> {
        self.header.as_ref()
    }

    pub fn take_header(&mut self) -> Option<RequestHeader> {
        self.header.take()
    }

    /// Prepares for the next request on the connection; buffers keep their capacity.
    pub fn reset(&mut self) {
        self.phase = Phase::Start;
        self.method.clear();
        self.target.clear();
        self.version.clear();
        self.name.clear();
        self.value.clear();
        self.pending = false;
        self.headers.clear();
        self.size = 0;
        self.header = None;
    }

    /// Feeds `bytes` through the state machine and returns how many were
    /// used; the rest belongs to whatever follows the header.
    fn update(&mut self, bytes: &[u8]) -> Result<usize, ParseError> {
        for (index, &byte) in bytes.iter().enumerate() {
            self.size += 1;
            ensure!(self.size <= self.max_header_bytes, ParseError::too_large_header(self.size, self.max_header_bytes));

            self.step(byte)?;

            if self.phase == Phase::Done {
                self.finish()?;
                return Ok(index + 1);
            }
        }
        Ok(bytes.len())
    }

    fn step(&mut self, byte: u8) -> Result<(), ParseError> {
        match self.phase {
            Phase::Start => {
                if !matches!(byte, b'\r' | b'\n') {
                    self.phase = Phase::Method;
                    self.method_byte(byte)?;
                }
            }
            Phase::Method => self.method_byte(byte)?,
            Phase::Target => match byte {
                b' ' => {
                    ensure!(!self.target.is_empty(), ParseError::request_line("empty request target"));
                    self.phase = Phase::Version;
                }
                b'\r' | b'\n' => return Err(ParseError::request_line("missing protocol version")),
                0x21..=0x7e | 0x80..=0xff => self.target.push(byte),
                _ => return Err(ParseError::request_line(format!("invalid target byte 0x{byte:02x}"))),
            },
            Phase::Version => match byte {
                b'\r' => self.phase = Phase::VersionLf,
                b'\n' => self.end_request_line()?,
                0x21..=0x7e => self.version.push(byte),
                _ => return Err(ParseError::request_line(format!("invalid version byte 0x{byte:02x}"))),
            },
            Phase::VersionLf => match byte {
                b'\n' => self.end_request_line()?,
                _ => return Err(ParseError::request_line("expected LF after request line")),
            },
            Phase::FieldStart => self.field_start(byte)?,
            Phase::Name => match byte {
                b':' => {
                    ensure!(!self.name.is_empty(), ParseError::header_field("empty header name"));
                    self.phase = Phase::ValueStart;
                }
                _ if is_token(byte) => self.name.push(byte),
                _ => return Err(ParseError::header_field(format!("invalid header name byte 0x{byte:02x}"))),
            },
            Phase::ValueStart => {
                if !matches!(byte, b' ' | b'\t') {
                    self.phase = Phase::Value;
                    self.value_byte(byte)?;
                }
            }
            Phase::Value => self.value_byte(byte)?,
            Phase::ValueLf => match byte {
                b'\n' => self.end_value_line(),
                _ => return Err(ParseError::header_field("expected LF after header value")),
            },
            Phase::Folding => {
                if !matches!(byte, b' ' | b'\t') {
                    if !self.value.is_empty() {
                        self.value.push(b' ');
                    }
                    self.phase = Phase::Value;
                    self.value_byte(byte)?;
                }
            }
            Phase::EndLf => match byte {
                b'\n' => self.phase = Phase::Done,
                _ => return Err(ParseError::header_field("expected LF after header block")),
            },
            Phase::Done => {}
        }
        Ok(())
    }

    fn method_byte(&mut self, byte: u8) -> Result<(), ParseError> {
        match byte {
            b' ' => {
                ensure!(!self.method.is_empty(), ParseError::request_line("empty method"));
                self.phase = Phase::Target;
            }
            _ if is_token(byte) => self.method.push(byte),
            _ => return Err(ParseError::request_line(format!("invalid method byte 0x{byte:02x}"))),
        }
        Ok(())
    }

    fn end_request_line(&mut self) -> Result<(), ParseError> {
        self.protocol = parse_version(self.version.as_bytes())?;
        trace!(method = self.method.text(), target = self.target.text(), "request line parsed");
        self.phase = Phase::FieldStart;
        Ok(())
    }

    fn field_start(&mut self, byte: u8) -> Result<(), ParseError> {
        if matches!(byte, b' ' | b'\t') {
            ensure!(self.pending, ParseError::header_field("continuation line without a header"));
            self.phase = Phase::Folding;
            return Ok(());
        }

        self.commit()?;
        match byte {
            b'\r' => self.phase = Phase::EndLf,
            b'\n' => self.phase = Phase::Done,
            _ if is_token(byte) => {
                self.name.push(byte);
                self.phase = Phase::Name;
            }
            _ => return Err(ParseError::header_field(format!("invalid header name byte 0x{byte:02x}"))),
        }
        Ok(())
    }

    fn value_byte(&mut self, byte: u8) -> Result<(), ParseError> {
        match byte {
            b'\r' => self.phase = Phase::ValueLf,
            b'\n' => self.end_value_line(),
            b'\t' | 0x20..=0x7e | 0x80..=0xff => self.value.push(byte),
            _ => return Err(ParseError::header_field(format!("invalid header value byte 0x{byte:02x}"))),
        }
        Ok(())
    }

    /// The header is only committed once the next line shows it is not folded.
    fn end_value_line(&mut self) {
        self.value.trim_end();
        self.pending = true;
        self.phase = Phase::FieldStart;
    }

    fn commit(&mut self) -> Result<(), ParseError> {
        if !self.pending {
            return Ok(());
        }

        ensure!(self.headers.len() < self.max_headers, ParseError::too_many_headers(self.max_headers));

        let name = HeaderName::from_bytes(self.name.as_bytes()).map_err(ParseError::header_field)?;
        let value = HeaderValue::from_bytes(self.value.as_bytes()).map_err(ParseError::header_field)?;
        self.headers.append(name, value);

        self.name.clear();
        self.value.clear();
        self.pending = false;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        let method = Method::from_bytes(self.method.as_bytes()).map_err(ParseError::request_line)?;
        let uri = Uri::try_from(self.target.as_bytes()).map_err(ParseError::request_line)?;
        let (major, minor) = self.protocol;
        let headers = mem::take(&mut self.headers);

        trace!(%method, %uri, headers = headers.len(), "request header parsed");
        self.header = Some(RequestHeader::new(method, uri, self.target.text().to_owned(), major, minor, headers));
        Ok(())
    }
}

impl Default for HeaderConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer for HeaderConsumer {
    fn consume<C: ByteCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<(), ParseError> {
        let mut chunk = [0u8; CHUNK_SIZE];

        while !self.is_finished() {
            let count = cursor.read(&mut chunk).map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => ParseError::Closed,
                _ => ParseError::io(e),
            })?;
            if count == 0 {
                break;
            }

            let used = self.update(&chunk[..count])?;
            if used < count {
                cursor.push(&chunk[used..count]);
            }
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }
}

/// `token` characters of RFC 7230 section 3.2.6.
#[inline]
fn is_token(byte: u8) -> bool {
    matches!(byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// `HTTP/<major>.<minor>`, only 1.0 and 1.1 are served.
fn parse_version(text: &[u8]) -> Result<(u8, u8), ParseError> {
    let digits = text.strip_prefix(b"HTTP/").ok_or_else(|| ParseError::request_line("missing HTTP/ prefix"))?;
    let dot = digits
        .iter()
        .position(|byte| *byte == b'.')
        .ok_or_else(|| ParseError::request_line("missing minor version"))?;

    let major = number(&digits[..dot])?;
    let minor = number(&digits[dot + 1..])?;
    ensure!(major == 1 && minor <= 1, ParseError::invalid_version(major, minor));
    Ok((major, minor))
}

fn number(digits: &[u8]) -> Result<u8, ParseError> {
    ensure!(!digits.is_empty(), ParseError::request_line("empty version number"));
    digits
        .iter()
        .try_fold(0u8, |number, byte| {
            let digit = byte.checked_sub(b'0').filter(|digit| *digit < 10)?;
            number.checked_mul(10)?.checked_add(digit)
        })
        .ok_or_else(|| ParseError::request_line("invalid version number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferCursor;
    use http::{Version, header};
    use indoc::indoc;

    fn parse(bytes: &[u8]) -> Result<RequestHeader, ParseError> {
        let mut cursor = BufferCursor::from(bytes);
        let mut consumer = HeaderConsumer::new();
        consumer.consume(&mut cursor)?;
        assert!(consumer.is_finished());
        Ok(consumer.take_header().unwrap())
    }

    fn crlf(text: &str) -> String {
        text.replace('\n', "\r\n")
    }

    #[test]
    fn from_curl() {
        let str = crlf(indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##});

        let header = parse(str.as_bytes()).unwrap();

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.target(), "/index.html");
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.uri().query(), None);
        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.value(header::ACCEPT), Some("*/*"));
        assert_eq!(header.value("host"), Some("127.0.0.1:8080"));
        assert_eq!(header.value(header::USER_AGENT), Some("curl/7.79.1"));
    }

    #[test]
    fn fragmentation_invariance() {
        let str = crlf(indoc! {r##"
        POST /submit?a=1&b=2 HTTP/1.1
        Host: example.com
        Accept: text/html;q=0.5, application/json
        X-Folded: first
          second
        Cookie: $Version=1; id=42; $Path=/
        Content-Length: 0

        "##});
        let bytes = str.as_bytes();
        let whole = parse(bytes).unwrap();

        for size in 1..bytes.len() {
            let mut cursor = BufferCursor::with_capacity(bytes.len());
            let mut consumer = HeaderConsumer::new();

            for piece in bytes.chunks(size) {
                assert!(!consumer.is_finished());
                cursor.extend_from_slice(piece);
                consumer.consume(&mut cursor).unwrap();
            }

            assert!(consumer.is_finished(), "chunk size {size}");
            let header = consumer.take_header().unwrap();
            assert_eq!(header.method(), whole.method());
            assert_eq!(header.target(), whole.target());
            assert_eq!(header.headers(), whole.headers());
            assert_eq!(header.cookies(), whole.cookies());
        }
    }

    #[test]
    fn folding_joins_with_single_space() {
        let folded = parse(b"GET / HTTP/1.1\r\nX-Long: alpha\r\n \t beta\r\n\tgamma\r\n\r\n").unwrap();
        let plain = parse(b"GET / HTTP/1.1\r\nX-Long: alpha beta gamma\r\n\r\n").unwrap();
        assert_eq!(folded.value("x-long"), Some("alpha beta gamma"));
        assert_eq!(folded.headers(), plain.headers());
    }

    #[test]
    fn surplus_bytes_are_pushed_back() {
        let mut cursor = BufferCursor::from(&b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n"[..]);
        let mut consumer = HeaderConsumer::new();

        consumer.consume(&mut cursor).unwrap();
        assert_eq!(consumer.take_header().unwrap().target(), "/a");
        assert_eq!(cursor.ready(), 19);

        consumer.reset();
        consumer.consume(&mut cursor).unwrap();
        assert_eq!(consumer.take_header().unwrap().target(), "/b");
        assert_eq!(cursor.ready(), 0);
    }

    #[test]
    fn leading_empty_lines_are_skipped() {
        let mut consumer = HeaderConsumer::new();
        let mut cursor = BufferCursor::from(&b"\r\n\r\n"[..]);
        consumer.consume(&mut cursor).unwrap();
        assert!(!consumer.is_started());

        cursor.extend_from_slice(b"HEAD / HTTP/1.0\r\n\r\n");
        consumer.consume(&mut cursor).unwrap();
        let header = consumer.take_header().unwrap();
        assert_eq!(header.method(), &Method::HEAD);
        assert_eq!((header.major(), header.minor()), (1, 0));
    }

    #[test]
    fn multi_valued_headers_keep_order() {
        let header = parse(b"GET / HTTP/1.1\r\nVia: a\r\nVIA: b\r\nvia: c\r\n\r\n").unwrap();
        assert_eq!(header.value("via"), Some("a"));
        assert_eq!(header.all("Via").collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn request_line_faults() {
        assert!(matches!(parse(b"GET\r\n\r\n"), Err(ParseError::RequestLine { .. })));
        assert!(matches!(parse(b"GET /index.html\r\n\r\n"), Err(ParseError::RequestLine { .. })));
        assert!(matches!(parse(b"G(T / HTTP/1.1\r\n\r\n"), Err(ParseError::RequestLine { .. })));
        assert!(matches!(parse(b"GET / HTCPCP/1.0\r\n\r\n"), Err(ParseError::RequestLine { .. })));
        assert!(matches!(parse(b"GET / HTTP/2.0\r\n\r\n"), Err(ParseError::InvalidVersion { major: 2, minor: 0 })));
    }

    #[test]
    fn header_field_faults() {
        assert!(matches!(parse(b"GET / HTTP/1.1\r\nBad Name: x\r\n\r\n"), Err(ParseError::HeaderField { .. })));
        assert!(matches!(parse(b"GET / HTTP/1.1\r\n folded: x\r\n\r\n"), Err(ParseError::HeaderField { .. })));
        assert!(matches!(parse(b"GET / HTTP/1.1\r\n: x\r\n\r\n"), Err(ParseError::HeaderField { .. })));
        assert!(matches!(parse(b"GET / HTTP/1.1\r\nX: a\x01b\r\n\r\n"), Err(ParseError::HeaderField { .. })));
    }

    #[test]
    fn limits() {
        let mut consumer = HeaderConsumer::with_limits(32, 64);
        let mut cursor = BufferCursor::from(&b"GET / HTTP/1.1\r\nX-Very-Long-Header: value\r\n\r\n"[..]);
        assert!(matches!(consumer.consume(&mut cursor), Err(ParseError::TooLargeHeader { max_size: 32, .. })));

        let mut consumer = HeaderConsumer::with_limits(1024, 2);
        let mut cursor = BufferCursor::from(&b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n"[..]);
        assert!(matches!(consumer.consume(&mut cursor), Err(ParseError::TooManyHeaders { max_num: 2 })));
    }

    #[test]
    fn closed_cursor_is_fatal() {
        let mut consumer = HeaderConsumer::new();
        let mut cursor = BufferCursor::from(&b"GET / HT"[..]);
        cursor.close();
        assert!(matches!(consumer.consume(&mut cursor), Err(ParseError::Closed)));
    }
}
