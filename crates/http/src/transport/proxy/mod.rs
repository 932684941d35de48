//! PROXY protocol preamble parsing.
//!
//! Load balancers such as HAProxy or AWS NLB prepend a small header to the
//! TCP stream naming the real client. Two encodings exist:
//!
//! - **v1**: a single text line, `PROXY TCP4 1.2.3.4 5.6.7.8 1234 80\r\n`
//! - **v2**: a binary block starting with a fixed 12 byte signature
//!
//! The readers never copy address bytes: a [`ProxyHeader`] borrows the probe's
//! peek buffer and renders the address text lazily, caching it on first access.

mod binary_reader;
mod text_reader;

use crate::protocol::ProbeError;
use once_cell::unsync::OnceCell;
use std::fmt::Write;
use std::net::SocketAddr;

/// Signature of a text (v1) preamble.
pub const PROXY_V1: &[u8; 5] = b"PROXY";

/// Signature of a binary (v2) preamble.
pub const PROXY_V2: &[u8; 12] = &[0x0D, 0x0A, 0x0D, 0x0A, 0x00, 0x0D, 0x0A, 0x51, 0x55, 0x49, 0x54, 0x0A];

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ProxyVersion {
    /// No preamble, the stream starts with the application protocol.
    #[default]
    None,
    V1,
    V2,
    /// Too few bytes to tell yet.
    Unknown,
}

impl ProxyVersion {
    /// Detects the preamble version from the first bytes of a stream.
    pub fn detect(header: &[u8]) -> Self {
        if header.starts_with(PROXY_V1) {
            return Self::V1;
        }
        if header.len() < PROXY_V1.len() && PROXY_V1.starts_with(header) {
            return Self::Unknown;
        }

        let count = header.len().min(PROXY_V2.len());
        if header[..count] != PROXY_V2[..count] {
            return Self::None;
        }
        if count < PROXY_V2.len() { Self::Unknown } else { Self::V2 }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ProtocolType {
    #[default]
    Unknown,
    Tcp4,
    Tcp6,
    Udp4,
    Udp6,
}

impl ProtocolType {
    pub fn is_ipv6(self) -> bool {
        matches!(self, Self::Tcp6 | Self::Udp6)
    }
}

/// Where one endpoint lives inside the peek buffer.
#[derive(Debug, Default)]
pub(crate) struct AddressSlot {
    protocol: ProtocolType,
    offset: usize,
    length: usize,
    port: u16,
    binary: bool,
    text: OnceCell<String>,
}

impl AddressSlot {
    fn set(&mut self, protocol: ProtocolType, offset: usize, length: usize, port: u16, binary: bool) {
        *self = Self { protocol, offset, length, port, binary, text: OnceCell::new() };
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn render(&self, data: &[u8]) -> String {
        let Some(bytes) = data.get(self.offset..self.offset + self.length) else {
            return String::new();
        };

        if !self.binary {
            return String::from_utf8_lossy(bytes).into_owned();
        }

        let mut text = String::with_capacity(39);
        if self.protocol.is_ipv6() {
            for (index, quad) in bytes.chunks_exact(2).enumerate() {
                if index > 0 {
                    text.push(':');
                }
                let _ = write!(text, "{:04x}", u16::from_be_bytes([quad[0], quad[1]]));
            }
        } else {
            for (index, octet) in bytes.iter().enumerate() {
                if index > 0 {
                    text.push('.');
                }
                let _ = write!(text, "{octet}");
            }
        }
        text
    }
}

/// Parses the preamble announced by [`ProxyVersion`] and remembers the endpoints.
#[derive(Debug, Default)]
pub(crate) struct ProxyHeaderReader {
    version: ProxyVersion,
    source: AddressSlot,
    destination: AddressSlot,
}

impl ProxyHeaderReader {
    /// Returns the total preamble length once it is complete, `None` while
    /// more bytes are needed.
    pub(crate) fn read(
        &mut self,
        version: ProxyVersion,
        data: &[u8],
        capacity: usize,
    ) -> Result<Option<usize>, ProbeError> {
        self.version = version;
        self.source.reset();
        self.destination.reset();

        match version {
            ProxyVersion::V1 => Ok(text_reader::read(data, PROXY_V1.len(), &mut self.source, &mut self.destination)),
            ProxyVersion::V2 => {
                binary_reader::read(data, PROXY_V2.len(), capacity, &mut self.source, &mut self.destination)
            }
            ProxyVersion::None | ProxyVersion::Unknown => Ok(Some(0)),
        }
    }

    pub(crate) fn header<'a>(&'a self, data: &'a [u8]) -> Option<ProxyHeader<'a>> {
        match self.version {
            ProxyVersion::V1 | ProxyVersion::V2 => Some(ProxyHeader {
                version: self.version,
                source: ProxyAddress { slot: &self.source, data },
                destination: ProxyAddress { slot: &self.destination, data },
            }),
            ProxyVersion::None | ProxyVersion::Unknown => None,
        }
    }
}

/// A parsed preamble, borrowed from the probe that read it.
#[derive(Debug, Clone, Copy)]
pub struct ProxyHeader<'a> {
    version: ProxyVersion,
    source: ProxyAddress<'a>,
    destination: ProxyAddress<'a>,
}

impl<'a> ProxyHeader<'a> {
    pub fn version(&self) -> ProxyVersion {
        self.version
    }

    pub fn source(&self) -> ProxyAddress<'a> {
        self.source
    }

    pub fn destination(&self) -> ProxyAddress<'a> {
        self.destination
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProxyAddress<'a> {
    slot: &'a AddressSlot,
    data: &'a [u8],
}

impl<'a> ProxyAddress<'a> {
    pub fn protocol(&self) -> ProtocolType {
        self.slot.protocol
    }

    pub fn port(&self) -> u16 {
        self.slot.port
    }

    /// The address text, rendered on first access. Empty when unknown.
    pub fn address(&self) -> &'a str {
        self.slot.text.get_or_init(|| self.slot.render(self.data))
    }
}

/// The client endpoint kept by the connection and handed to handlers as a
/// request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress {
    address: String,
    port: u16,
    protocol: ProtocolType,
}

impl ClientAddress {
    pub fn new(address: impl Into<String>, port: u16, protocol: ProtocolType) -> Self {
        Self { address: address.into(), port, protocol }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn protocol(&self) -> ProtocolType {
        self.protocol
    }
}

impl From<ProxyAddress<'_>> for ClientAddress {
    fn from(address: ProxyAddress<'_>) -> Self {
        Self::new(address.address(), address.port(), address.protocol())
    }
}

impl From<SocketAddr> for ClientAddress {
    fn from(address: SocketAddr) -> Self {
        let protocol = if address.is_ipv6() { ProtocolType::Tcp6 } else { ProtocolType::Tcp4 };
        Self::new(address.ip().to_string(), address.port(), protocol)
    }
}
