//! Response bodies delimited by closing the connection.

use super::{Observer, Producer, Sender};
use crate::ensure;
use crate::protocol::SendError;

/// Sends bytes as they are; the end of the body is the end of the connection.
#[derive(Debug)]
pub struct CloseProducer<'a, S: Sender> {
    sender: &'a mut S,
    observer: &'a dyn Observer,
}

impl<'a, S: Sender> CloseProducer<'a, S> {
    pub fn new(sender: &'a mut S, observer: &'a dyn Observer) -> Self {
        Self { sender, observer }
    }

    pub fn sender_mut(&mut self) -> &mut S {
        self.sender
    }
}

impl<S: Sender> Producer for CloseProducer<'_, S> {
    fn produce(&mut self, data: &[u8]) -> Result<(), SendError> {
        if data.is_empty() {
            return Ok(());
        }
        ensure!(!self.observer.is_closed(), SendError::Closed);

        if let Err(e) = self.sender.send(data) {
            self.observer.error(&mut *self.sender);
            return Err(e);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SendError> {
        if self.observer.is_closed() {
            return Ok(());
        }
        if let Err(e) = self.sender.flush() {
            self.observer.close(&mut *self.sender);
            return Err(e);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SendError> {
        if !self.observer.is_closed() {
            self.observer.close(&mut *self.sender);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::testing::RecordingSender;
    use crate::connection::ResponseObserver;

    #[test]
    fn close_ends_the_connection() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = CloseProducer::new(&mut sender, &observer);

        producer.produce(b"raw ").unwrap();
        producer.produce(b"bytes").unwrap();
        producer.flush().unwrap();
        producer.close().unwrap();

        assert!(observer.is_closed());
        assert!(!observer.is_ready());
        assert_eq!(sender.bytes(), b"raw bytes");
        assert!(sender.closed);
    }
}
