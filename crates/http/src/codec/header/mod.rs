//! HTTP header processing module
//!
//! # Components
//!
//! - [`ParseBuffer`]: growable token accumulator
//! - [`HeaderConsumer`]: incremental request header parser
//! - [`HeaderEncoder`]: response head serializer

mod header_consumer;
mod header_encoder;
mod parse_buffer;

pub use header_consumer::HeaderConsumer;
pub use header_consumer::MAX_HEADERS;
pub use header_consumer::MAX_HEADER_BYTES;
pub use header_encoder::HeaderEncoder;
pub use parse_buffer::ParseBuffer;
