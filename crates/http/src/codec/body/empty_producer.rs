//! Responses that carry no body: HEAD replies, 204, 304.

use super::{Observer, Producer, Sender};
use crate::protocol::SendError;

/// Discards every byte, closing completes the response.
#[derive(Debug)]
pub struct EmptyProducer<'a, S: Sender> {
    sender: &'a mut S,
    observer: &'a dyn Observer,
}

impl<'a, S: Sender> EmptyProducer<'a, S> {
    pub fn new(sender: &'a mut S, observer: &'a dyn Observer) -> Self {
        Self { sender, observer }
    }

    pub fn sender_mut(&mut self) -> &mut S {
        self.sender
    }
}

impl<S: Sender> Producer for EmptyProducer<'_, S> {
    fn produce(&mut self, _data: &[u8]) -> Result<(), SendError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SendError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), SendError> {
        self.observer.ready(&mut *self.sender);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::testing::RecordingSender;
    use crate::connection::ResponseObserver;

    #[test]
    fn bytes_are_discarded() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = EmptyProducer::new(&mut sender, &observer);

        producer.produce(b"ignored").unwrap();
        producer.close().unwrap();

        assert!(sender.frames.is_empty());
        assert!(observer.is_ready());
    }
}
