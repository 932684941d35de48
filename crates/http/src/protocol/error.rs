use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("transport error: {source}")]
    TransportError {
        #[from]
        source: ProbeError,
    },

    #[error("connection error: {source}")]
    ConnectionError {
        #[from]
        source: ConnectionError,
    },
}

/// The parse phase a [`ParseError`] was raised in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParsePhase {
    RequestLine,
    HeaderField,
    Body,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid request line: {reason}")]
    RequestLine { reason: String },

    #[error("invalid header field: {reason}")]
    HeaderField { reason: String },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid http version: HTTP/{major}.{minor}")]
    InvalidVersion { major: u8, minor: u8 },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: u64, max_size: u64 },

    #[error("connection closed before the request was complete")]
    Closed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn request_line<S: ToString>(str: S) -> Self {
        Self::RequestLine { reason: str.to_string() }
    }

    pub fn header_field<S: ToString>(str: S) -> Self {
        Self::HeaderField { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_version(major: u8, minor: u8) -> Self {
        Self::InvalidVersion { major, minor }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(current_size: u64, max_size: u64) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// The phase the fault belongs to, `None` for transport faults.
    pub fn phase(&self) -> Option<ParsePhase> {
        match self {
            Self::RequestLine { .. } | Self::InvalidVersion { .. } => Some(ParsePhase::RequestLine),
            Self::HeaderField { .. } | Self::TooLargeHeader { .. } | Self::TooManyHeaders { .. } => {
                Some(ParsePhase::HeaderField)
            }
            Self::InvalidContentLength { .. } | Self::InvalidBody { .. } | Self::TooLargeBody { .. } => {
                Some(ParsePhase::Body)
            }
            Self::Closed | Self::Io { .. } => None,
        }
    }

    /// Whether the peer should be answered with `400 Bad Request` before closing.
    pub fn is_protocol_fault(&self) -> bool {
        self.phase().is_some()
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("response stream has been closed")]
    Closed,

    #[error("fixed length response of {limit} bytes would grow to {attempted} bytes")]
    LengthExceeded { limit: u64, attempted: u64 },

    #[error("fixed length response closed after {written} of {expected} bytes")]
    Incomplete { expected: u64, written: u64 },

    #[error("chunk of {size} bytes can't be described by the chunk size line")]
    ChunkTooLarge { size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn length_exceeded(limit: u64, attempted: u64) -> Self {
        Self::LengthExceeded { limit, attempted }
    }

    pub fn incomplete(expected: u64, written: u64) -> Self {
        Self::Incomplete { expected, written }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Faults raised while classifying a fresh connection. The connection is
/// dropped without a reply.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProbeError {
    #[error("invalid proxy header: {reason}")]
    InvalidHeader { reason: &'static str },

    #[error("proxy header of {length} bytes does not fit the {capacity} bytes peek buffer")]
    TooLarge { length: usize, capacity: usize },

    #[error("peeked {capacity} bytes without recognising the transport")]
    Exhausted { capacity: usize },
}

impl ProbeError {
    pub fn invalid_header(reason: &'static str) -> Self {
        Self::InvalidHeader { reason }
    }
}

/// A header value that exists but can't be read as the requested type.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValueError {
    #[error("header {name} is not an integer: {value:?}")]
    InvalidInteger { name: String, value: String },

    #[error("header {name} is not an http date: {value:?}")]
    InvalidDate { name: String, value: String },

    #[error("header {name} contains non visible ascii characters")]
    NotText { name: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("previous response has not completed")]
    Busy,

    #[error("connection already closed")]
    Closed,

    #[error("read timed out after {millis} ms")]
    Timeout { millis: u128 },

    #[error("secure transport is not handled by this connection")]
    SecureUnsupported,
}
