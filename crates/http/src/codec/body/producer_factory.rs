//! Picks the body framing of a response once its head is final.

use tracing::debug;

use super::{ChunkedProducer, CloseProducer, EmptyProducer, FixedProducer, Observer, Producer, Sender};
use crate::protocol::{Conversation, SendError};

/// The body framing chosen for a response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    Empty,
    Close,
    Fixed(u64),
    Chunked,
}

#[derive(Debug, Copy, Clone)]
pub struct ProducerFactory {
    framing: Framing,
}

impl ProducerFactory {
    /// Decides the framing from the finalized response head.
    ///
    /// A HEAD reply never has a body whatever its headers say. Otherwise a
    /// connection that won't be kept, or turns into a tunnel, is delimited
    /// by closing it.
    pub fn new(conversation: &Conversation<'_>) -> Self {
        let framing = if conversation.is_head() {
            Framing::Empty
        } else if !conversation.is_keep_alive() || conversation.is_tunnel() {
            Framing::Close
        } else {
            match conversation.content_length() {
                Some(length) if length > 0 => Framing::Fixed(length),
                _ if conversation.is_chunked_encoded() => Framing::Chunked,
                _ => Framing::Empty,
            }
        };

        debug!(?framing, "selected response framing");
        Self { framing }
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn producer<'a, S: Sender>(&self, sender: &'a mut S, observer: &'a dyn Observer) -> BodyProducer<'a, S> {
        match self.framing {
            Framing::Empty => BodyProducer::Empty(EmptyProducer::new(sender, observer)),
            Framing::Close => BodyProducer::Close(CloseProducer::new(sender, observer)),
            Framing::Fixed(length) => BodyProducer::Fixed(FixedProducer::new(sender, observer, length)),
            Framing::Chunked => BodyProducer::Chunked(ChunkedProducer::new(sender, observer)),
        }
    }
}

/// One of the four producers, chosen by [`ProducerFactory`].
#[derive(Debug)]
pub enum BodyProducer<'a, S: Sender> {
    Empty(EmptyProducer<'a, S>),
    Close(CloseProducer<'a, S>),
    Fixed(FixedProducer<'a, S>),
    Chunked(ChunkedProducer<'a, S>),
}

impl<S: Sender> BodyProducer<'_, S> {
    /// The sender the producer writes to, the connection drains it between frames.
    pub fn sender_mut(&mut self) -> &mut S {
        match self {
            Self::Empty(producer) => producer.sender_mut(),
            Self::Close(producer) => producer.sender_mut(),
            Self::Fixed(producer) => producer.sender_mut(),
            Self::Chunked(producer) => producer.sender_mut(),
        }
    }

    fn inner(&mut self) -> &mut dyn Producer {
        match self {
            Self::Empty(producer) => producer,
            Self::Close(producer) => producer,
            Self::Fixed(producer) => producer,
            Self::Chunked(producer) => producer,
        }
    }
}

impl<S: Sender> Producer for BodyProducer<'_, S> {
    fn produce(&mut self, data: &[u8]) -> Result<(), SendError> {
        self.inner().produce(data)
    }

    fn flush(&mut self) -> Result<(), SendError> {
        self.inner().flush()
    }

    fn close(&mut self) -> Result<(), SendError> {
        self.inner().close()
    }
}
