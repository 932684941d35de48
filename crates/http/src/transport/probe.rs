//! Transport classification for freshly accepted connections.
//!
//! Before the HTTP layer sees a single byte, the probe peeks at the start of
//! the stream to find out whether the client speaks TLS, plain HTTP, and
//! whether a load balancer prepended a PROXY protocol preamble. The preamble
//! is skipped so the HTTP parser starts at the request line.

use super::proxy::{ProxyHeader, ProxyHeaderReader, ProxyVersion};
use crate::protocol::ProbeError;
use bytes::{Buf, BytesMut};
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

/// Default size of the peek buffer, the longest legal v1 line. Only the
/// preamble has to fit, the bytes after it are classified from the caller's buffer.
pub const DEFAULT_CAPACITY: usize = 107;

/// Bytes needed after any preamble before the transport can be classified.
const MIN_LENGTH: usize = 5;

const TLS_HANDSHAKE: u8 = 0x16;
const CLIENT_HELLO: u8 = 0x01;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportType {
    Unknown,
    Plain,
    Secure,
}

#[derive(Debug)]
pub struct TransportProbe {
    transport: OnceCell<TransportType>,
    reader: ProxyHeaderReader,
    peek: Box<[u8]>,
    count: usize,
    proxy_length: usize,
}

impl TransportProbe {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transport: OnceCell::new(),
            reader: ProxyHeaderReader::default(),
            peek: vec![0; capacity].into_boxed_slice(),
            count: 0,
            proxy_length: 0,
        }
    }

    /// A probe for connections this side opened, which are always secure.
    pub fn client() -> Self {
        let probe = Self::with_capacity(0);
        let _ = probe.transport.set(TransportType::Secure);
        probe
    }

    /// The classification so far, `Unknown` until decided.
    pub fn transport_type(&self) -> TransportType {
        self.transport.get().copied().unwrap_or(TransportType::Unknown)
    }

    pub fn capacity(&self) -> usize {
        self.peek.len()
    }

    /// The PROXY preamble, if the connection carried one.
    pub fn header(&self) -> Option<ProxyHeader<'_>> {
        self.transport.get()?;
        self.reader.header(&self.peek[..self.count])
    }

    /// Number of preamble bytes removed from the stream.
    pub fn proxy_length(&self) -> usize {
        self.proxy_length
    }

    /// Classifies the connection from the bytes received so far.
    ///
    /// `buffer` holds everything read from the socket and not yet consumed.
    /// Nothing is taken from it until the transport is known; at that point
    /// the proxy preamble, if any, is advanced past. Later calls return the
    /// cached answer and leave `buffer` untouched.
    pub fn probe(&mut self, buffer: &mut BytesMut) -> Result<TransportType, ProbeError> {
        if let Some(transport) = self.transport.get() {
            return Ok(*transport);
        }

        let end = buffer.len().min(self.peek.len());
        if end > self.count {
            self.peek[self.count..end].copy_from_slice(&buffer[self.count..end]);
            self.count = end;
        }

        if self.count < MIN_LENGTH {
            return self.waiting();
        }

        let header = &self.peek[..self.count];
        let version = ProxyVersion::detect(header);
        let offset = match version {
            ProxyVersion::Unknown => return self.waiting(),
            ProxyVersion::None => 0,
            ProxyVersion::V1 | ProxyVersion::V2 => match self.reader.read(version, header, self.peek.len())? {
                Some(length) => length,
                None => return self.waiting(),
            },
        };

        // the preamble is whole, what follows it is read from `buffer` so a
        // preamble filling the peek buffer still leaves room to classify
        let Some(transport) = classify(&buffer[offset..]) else {
            return if offset == 0 { self.waiting() } else { Ok(TransportType::Unknown) };
        };

        trace!(?version, proxy_length = offset, ?transport, "transport classified");
        buffer.advance(offset);
        self.proxy_length = offset;
        let _ = self.transport.set(transport);
        Ok(transport)
    }

    fn waiting(&self) -> Result<TransportType, ProbeError> {
        if self.count == self.peek.len() {
            debug!(capacity = self.peek.len(), "peek buffer exhausted before classification");
            return Err(ProbeError::Exhausted { capacity: self.peek.len() });
        }
        Ok(TransportType::Unknown)
    }
}

impl Default for TransportProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks at the first bytes after any preamble.
fn classify(bytes: &[u8]) -> Option<TransportType> {
    if bytes.len() < MIN_LENGTH {
        return None;
    }

    // SSLv2 record header
    if bytes[0] & 0x80 == 0x80 && bytes[2] == CLIENT_HELLO {
        return Some(TransportType::Secure);
    }

    if bytes[0] == TLS_HANDSHAKE {
        return bytes.get(5).map(|byte| {
            if *byte == CLIENT_HELLO { TransportType::Secure } else { TransportType::Plain }
        });
    }

    Some(TransportType::Plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::proxy::{PROXY_V2, ProtocolType};

    #[test]
    fn unknown_below_min_length() {
        let mut probe = TransportProbe::new();
        let mut buffer = BytesMut::new();

        for byte in b"GET " {
            buffer.extend_from_slice(&[*byte]);
            assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Unknown));
        }

        buffer.extend_from_slice(b"/ HTTP/1.1\r\n");
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Plain));
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn classification_is_stable() {
        let mut probe = TransportProbe::new();
        let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n"[..]);
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Plain));

        let mut other = BytesMut::from(&[0x16, 0x03, 0x01, 0x00, 0xa5, 0x01][..]);
        assert_eq!(probe.probe(&mut other), Ok(TransportType::Plain));
        assert_eq!(other.len(), 6);
        assert_eq!(probe.transport_type(), TransportType::Plain);
    }

    #[test]
    fn tls_client_hello_is_secure() {
        let mut probe = TransportProbe::new();
        let mut buffer = BytesMut::from(&[0x16, 0x03, 0x01, 0x00, 0xa5][..]);
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Unknown));

        buffer.extend_from_slice(&[0x01, 0x00, 0x00, 0xa1, 0x03, 0x03]);
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Secure));
    }

    #[test]
    fn sslv2_hello_is_secure() {
        let mut probe = TransportProbe::new();
        let mut buffer = BytesMut::from(&[0x80, 0x2e, 0x01, 0x00, 0x02, 0x00][..]);
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Secure));
    }

    #[test]
    fn proxy_v1_is_skipped() {
        let mut probe = TransportProbe::new();
        let preamble = b"PROXY TCP4 203.0.113.7 10.0.0.1 51000 80\r\n";
        let mut buffer = BytesMut::from(&preamble[..]);
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Unknown));

        buffer.extend_from_slice(b"GET / HTTP/1.1\r\n");
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Plain));
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");
        assert_eq!(probe.proxy_length(), preamble.len());

        let header = probe.header().unwrap();
        assert_eq!(header.version(), ProxyVersion::V1);
        assert_eq!(header.source().address(), "203.0.113.7");
        assert_eq!(header.source().port(), 51000);
        assert_eq!(header.destination().address(), "10.0.0.1");
    }

    #[test]
    fn proxy_v2_ipv4_is_skipped() {
        let mut buffer = BytesMut::from(&PROXY_V2[..]);
        buffer.extend_from_slice(&[0x21, 0x11, 0x00, 0x0c]);
        buffer.extend_from_slice(&[192, 168, 1, 1, 192, 168, 1, 2, 0x1f, 0x90, 0x01, 0xbb]);
        buffer.extend_from_slice(b"GET /index.html HTTP/1.1\r\n");

        let mut probe = TransportProbe::new();
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Plain));
        assert_eq!(probe.proxy_length(), 28);
        assert!(buffer.starts_with(b"GET /index.html"));

        let source = probe.header().unwrap().source();
        assert_eq!(source.protocol(), ProtocolType::Tcp4);
        assert_eq!(source.address(), "192.168.1.1");
        assert_eq!(source.port(), 8080);
    }

    #[test]
    fn proxy_v2_then_tls() {
        let mut buffer = BytesMut::from(&PROXY_V2[..]);
        buffer.extend_from_slice(&[0x20, 0x00, 0x00, 0x00]);
        buffer.extend_from_slice(&[0x16, 0x03, 0x01, 0x02, 0x00, 0x01]);

        let mut probe = TransportProbe::new();
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Secure));
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn longest_v1_line_leaves_room_to_classify() {
        let mut line = b"PROXY TCP6 ".to_vec();
        let address = "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff";
        line.extend_from_slice(format!("{address} {address} 65535 65535\r\n").as_bytes());
        assert_eq!(line.len(), 104);

        let mut probe = TransportProbe::new();
        let mut buffer = BytesMut::from(&line[..]);
        buffer.extend_from_slice(b"GE");
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Unknown));

        buffer.extend_from_slice(b"T / HTTP/1.1\r\n\r\n");
        assert_eq!(probe.probe(&mut buffer), Ok(TransportType::Plain));
        assert_eq!(probe.proxy_length(), 104);
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n\r\n");

        let source = probe.header().unwrap().source();
        assert_eq!(source.protocol(), ProtocolType::Tcp6);
        assert_eq!(source.port(), 65535);
    }

    #[test]
    fn exhausted_peek_is_fatal() {
        let mut probe = TransportProbe::with_capacity(16);
        assert_eq!(probe.capacity(), 16);
        let mut buffer = BytesMut::from(&b"PROXY TCP4 1.2.3.4 "[..]);
        assert_eq!(probe.probe(&mut buffer), Err(ProbeError::Exhausted { capacity: 16 }));
    }

    #[test]
    fn client_probe_starts_secure() {
        let mut probe = TransportProbe::client();
        assert_eq!(probe.transport_type(), TransportType::Secure);
        assert_eq!(probe.probe(&mut BytesMut::new()), Ok(TransportType::Secure));
        assert!(probe.header().is_none());
    }
}
