//! Response bodies framed by `Content-Length`.

use tracing::{trace, warn};

use super::{Observer, Producer, Sender};
use crate::ensure;
use crate::protocol::SendError;

/// Sends exactly `limit` bytes.
///
/// Reaching the limit completes the response, anything past it is refused,
/// and closing short of it fails the response.
#[derive(Debug)]
pub struct FixedProducer<'a, S: Sender> {
    sender: &'a mut S,
    observer: &'a dyn Observer,
    limit: u64,
    count: u64,
}

impl<'a, S: Sender> FixedProducer<'a, S> {
    pub fn new(sender: &'a mut S, observer: &'a dyn Observer, limit: u64) -> Self {
        Self { sender, observer, limit, count: 0 }
    }

    pub fn sender_mut(&mut self) -> &mut S {
        self.sender
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.count
    }
}

impl<S: Sender> Producer for FixedProducer<'_, S> {
    fn produce(&mut self, data: &[u8]) -> Result<(), SendError> {
        if data.is_empty() {
            return Ok(());
        }
        let attempted = self.count + data.len() as u64;
        if attempted > self.limit {
            warn!(limit = self.limit, attempted, "response body exceeds its content length");
            self.observer.error(&mut *self.sender);
            return Err(SendError::length_exceeded(self.limit, attempted));
        }
        ensure!(!self.observer.is_closed(), SendError::Closed);

        if let Err(e) = self.sender.send(data) {
            self.observer.error(&mut *self.sender);
            return Err(e);
        }
        self.count = attempted;
        trace!(count = self.count, limit = self.limit, "sent fixed length bytes");

        if self.count == self.limit {
            self.observer.ready(&mut *self.sender);
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
        if self.observer.is_closed() {
            return Ok(());
        }
        if self.count < self.limit {
            self.observer.error(&mut *self.sender);
            return Err(SendError::incomplete(self.limit, self.count));
        }
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
    fn reaching_the_length_completes() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = FixedProducer::new(&mut sender, &observer, 10);

        producer.produce(b"hello").unwrap();
        assert!(!observer.is_closed());
        assert_eq!(producer.remaining(), 5);

        producer.produce(b"world").unwrap();
        assert!(observer.is_ready());
        producer.close().unwrap();

        assert_eq!(sender.bytes(), b"helloworld");
        assert_eq!(sender.flushes, 1);
    }

    #[test]
    fn excess_is_refused() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = FixedProducer::new(&mut sender, &observer, 4);

        let error = producer.produce(b"too long").unwrap_err();
        assert!(matches!(error, SendError::LengthExceeded { limit: 4, attempted: 8 }));
        assert!(observer.is_error());
        assert!(sender.frames.is_empty());
    }

    #[test]
    fn excess_after_completion_is_refused() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = FixedProducer::new(&mut sender, &observer, 2);

        producer.produce(b"ok").unwrap();
        assert!(observer.is_ready());

        let error = producer.produce(b"!").unwrap_err();
        assert!(matches!(error, SendError::LengthExceeded { limit: 2, attempted: 3 }));
        assert_eq!(sender.bytes(), b"ok");
    }

    #[test]
    fn closing_short_fails() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();
        let mut producer = FixedProducer::new(&mut sender, &observer, 4);

        producer.produce(b"ab").unwrap();
        assert!(matches!(producer.close(), Err(SendError::Incomplete { expected: 4, written: 2 })));
        assert!(observer.is_error());
        assert!(sender.closed);
    }
}
