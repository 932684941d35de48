//! Tunable limits of a connection.

use std::time::Duration;

use crate::codec::{MAX_BODY_BYTES, MAX_HEADERS, MAX_HEADER_BYTES};
use crate::transport::DEFAULT_CAPACITY;

/// Limits shared by every connection of a server.
///
/// ```
/// use std::time::Duration;
/// use wire_http::config::ServerConfig;
///
/// let config = ServerConfig::builder().max_body_bytes(64 * 1024).read_timeout(Duration::from_secs(5)).build();
/// assert_eq!(config.max_headers(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    probe_capacity: usize,
    max_header_bytes: usize,
    max_headers: usize,
    max_body_bytes: u64,
    read_buffer_size: usize,
    read_timeout: Duration,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Size of the buffer the transport probe peeks into.
    pub fn probe_capacity(&self) -> usize {
        self.probe_capacity
    }

    pub fn max_header_bytes(&self) -> usize {
        self.max_header_bytes
    }

    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// How long a connection may wait for the rest of a request.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            probe_capacity: DEFAULT_CAPACITY,
            max_header_bytes: MAX_HEADER_BYTES,
            max_headers: MAX_HEADERS,
            max_body_bytes: MAX_BODY_BYTES,
            read_buffer_size: 8 * 1024,
            read_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default() }
    }

    #[must_use]
    pub fn probe_capacity(mut self, capacity: usize) -> Self {
        self.config.probe_capacity = capacity;
        self
    }

    #[must_use]
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.config.max_header_bytes = max_header_bytes;
        self
    }

    #[must_use]
    pub fn max_headers(mut self, max_headers: usize) -> Self {
        self.config.max_headers = max_headers;
        self
    }

    #[must_use]
    pub fn max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.config.max_body_bytes = max_body_bytes;
        self
    }

    #[must_use]
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
