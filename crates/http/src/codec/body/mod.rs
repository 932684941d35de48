//! Request body decoding and response body framing.
//!
//! # Components
//!
//! ## Request side
//! - [`ChunkedDecoder`], [`LengthDecoder`]: the two request body framings
//! - [`PayloadDecoder`]: picks one of them from the request's `PayloadSize`
//! - [`BodyConsumer`]: collects a whole body from a `ByteCursor`
//!
//! ## Response side
//! - [`Sender`], [`Observer`], [`Producer`]: the collaborators a body is written through
//! - [`ChunkedProducer`], [`FixedProducer`], [`CloseProducer`], [`EmptyProducer`]
//! - [`ProducerFactory`]: picks the producer from the finalized response head

mod body_consumer;
mod chunked_decoder;
mod chunked_producer;
mod close_producer;
mod empty_producer;
mod fixed_producer;
mod length_decoder;
mod payload_decoder;
mod producer;
mod producer_factory;

pub use body_consumer::{BodyConsumer, MAX_BODY_BYTES};
pub use chunked_decoder::ChunkedDecoder;
pub use chunked_producer::ChunkedProducer;
pub use close_producer::CloseProducer;
pub use empty_producer::EmptyProducer;
pub use fixed_producer::FixedProducer;
pub use length_decoder::LengthDecoder;
pub use payload_decoder::PayloadDecoder;
pub use producer::{Observer, Producer, Sender};
pub use producer_factory::{BodyProducer, Framing, ProducerFactory};

#[cfg(test)]
pub(crate) use producer::testing;
