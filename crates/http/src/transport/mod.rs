//! Byte sources and transport detection.
//!
//! - [`ByteCursor`] / [`BufferCursor`]: the non-blocking cursor every parser reads from
//! - [`TransportProbe`]: plain / TLS / PROXY preamble classification
//! - [`proxy`]: PROXY protocol v1 and v2 readers

mod cursor;
mod probe;
pub mod proxy;

pub use cursor::BufferCursor;
pub use cursor::ByteCursor;
pub use probe::DEFAULT_CAPACITY;
pub use probe::TransportProbe;
pub use probe::TransportType;
