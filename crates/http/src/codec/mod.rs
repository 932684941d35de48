//! Wire encoding and decoding of HTTP/1.x messages.
//!
//! Parsers in this module are fed from a [`ByteCursor`](crate::transport::ByteCursor)
//! through the [`Consumer`] trait. They never wait for bytes: each call takes
//! what is ready, keeps its partial state, and returns.
//!
//! - [`header`]: the request header state machine and the response head encoder
//! - [`body`]: request body decoders and the response body producers
//!
//! # Example
//!
//! ```
//! use wire_http::codec::{Consumer, HeaderConsumer};
//! use wire_http::transport::BufferCursor;
//!
//! let mut cursor = BufferCursor::from(&b"GET /index.html HTTP/1.1\r\nHost: "[..]);
//! let mut consumer = HeaderConsumer::new();
//! consumer.consume(&mut cursor).unwrap();
//! assert!(!consumer.is_finished());
//!
//! cursor.extend_from_slice(b"example.com\r\n\r\n");
//! consumer.consume(&mut cursor).unwrap();
//! let header = consumer.take_header().unwrap();
//! assert_eq!(header.path().path(), "/index.html");
//! ```

pub mod body;
mod consumer;
pub mod header;

pub use body::{
    BodyConsumer, BodyProducer, ChunkedDecoder, ChunkedProducer, CloseProducer, EmptyProducer, FixedProducer, Framing,
    LengthDecoder, Observer, PayloadDecoder, Producer, ProducerFactory, Sender, MAX_BODY_BYTES,
};
pub use consumer::Consumer;
pub use header::{HeaderConsumer, HeaderEncoder, ParseBuffer, MAX_HEADERS, MAX_HEADER_BYTES};

#[cfg(test)]
pub(crate) use body::testing;
