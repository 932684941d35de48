use bytes::Bytes;
use tracing::{debug, trace};

use super::{RequestCollector, ResponseObserver};
use crate::codec::Consumer;
use crate::protocol::{ConnectionError, HttpError, RequestHeader};
use crate::transport::ByteCursor;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// Waiting to read the next request
    Start,
    /// Waiting for the socket to become readable
    Selecting,
    /// Consuming buffered bytes
    Reading,
    /// A request was dispatched, its response is in flight
    Ready,
    Closed,
}

/// What the connection does after the controller consumed the buffered bytes.
#[derive(Debug)]
pub enum Dispatch {
    /// A whole request arrived
    Ready(Box<RequestHeader>, Bytes),
    /// More bytes are needed
    Select,
}

/// The lifecycle of one connection.
///
/// Requests are read one at a time: after a request is dispatched nothing
/// more is read until its response [`complete`](Self::complete)s, which
/// keeps pipelined responses in request order.
#[derive(Debug)]
pub struct ConnectionController {
    state: ControllerState,
    served: usize,
}

impl ConnectionController {
    pub fn new() -> Self {
        Self { state: ControllerState::Start, served: 0 }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ControllerState::Closed
    }

    /// Number of responses completed on this connection.
    pub fn served(&self) -> usize {
        self.served
    }

    /// Begins the next request with whatever is already buffered.
    pub fn start<C: ByteCursor + ?Sized>(
        &mut self,
        collector: &mut RequestCollector,
        cursor: &mut C,
    ) -> Result<Dispatch, HttpError> {
        match self.state {
            ControllerState::Start => self.collect(collector, cursor),
            ControllerState::Closed => Err(ConnectionError::Closed.into()),
            _ => Err(ConnectionError::Busy.into()),
        }
    }

    /// Parks the connection until the socket is readable.
    pub fn select(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            ControllerState::Reading | ControllerState::Selecting => {
                self.state = ControllerState::Selecting;
                Ok(())
            }
            ControllerState::Closed => Err(ConnectionError::Closed),
            _ => Err(ConnectionError::Busy),
        }
    }

    /// New bytes arrived while selecting.
    pub fn readable<C: ByteCursor + ?Sized>(
        &mut self,
        collector: &mut RequestCollector,
        cursor: &mut C,
    ) -> Result<Dispatch, HttpError> {
        match self.state {
            ControllerState::Selecting => self.collect(collector, cursor),
            ControllerState::Closed => Err(ConnectionError::Closed.into()),
            _ => Err(ConnectionError::Busy.into()),
        }
    }

    fn collect<C: ByteCursor + ?Sized>(
        &mut self,
        collector: &mut RequestCollector,
        cursor: &mut C,
    ) -> Result<Dispatch, HttpError> {
        self.state = ControllerState::Reading;
        if let Err(e) = collector.consume(cursor) {
            self.state = ControllerState::Closed;
            return Err(e.into());
        }

        match collector.take_request() {
            Some((header, body)) => {
                trace!(served = self.served, "request ready for dispatch");
                self.state = ControllerState::Ready;
                Ok(Dispatch::Ready(Box::new(header), body))
            }
            None => Ok(Dispatch::Select),
        }
    }

    /// The in flight response finished; returns whether the next request may be read.
    pub fn complete(&mut self, observer: &ResponseObserver, keep_alive: bool) -> bool {
        if self.state != ControllerState::Ready {
            return false;
        }

        self.served += 1;
        self.state = if observer.is_ready() && keep_alive { ControllerState::Start } else { ControllerState::Closed };
        debug!(served = self.served, state = ?self.state, elapsed = ?observer.elapsed(), "response completed");
        self.state == ControllerState::Start
    }

    /// Gives up on the connection, a collector reading afterwards fails.
    pub fn cancel<C: ByteCursor + ?Sized>(&mut self, cursor: &mut C) {
        cursor.close();
        self.state = ControllerState::Closed;
    }

    pub fn stop(&mut self) {
        self.state = ControllerState::Closed;
    }
}

impl Default for ConnectionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Observer, testing::RecordingSender};
    use crate::config::ServerConfig;
    use crate::protocol::ParseError;
    use crate::transport::BufferCursor;

    fn ready_observer() -> ResponseObserver {
        let observer = ResponseObserver::new();
        observer.ready(&mut RecordingSender::default());
        observer
    }

    #[test]
    fn select_until_the_request_is_whole() {
        let mut controller = ConnectionController::new();
        let mut collector = RequestCollector::new(&ServerConfig::default());
        let mut cursor = BufferCursor::from(&b"GET / HTTP/1.1\r\n"[..]);

        assert!(matches!(controller.start(&mut collector, &mut cursor), Ok(Dispatch::Select)));
        controller.select().unwrap();
        assert_eq!(controller.state(), ControllerState::Selecting);

        cursor.extend_from_slice(b"Host: a\r\n\r\n");
        let dispatch = controller.readable(&mut collector, &mut cursor).unwrap();
        assert!(matches!(dispatch, Dispatch::Ready(..)));
        assert_eq!(controller.state(), ControllerState::Ready);
    }

    #[test]
    fn next_request_waits_for_completion() {
        let mut controller = ConnectionController::new();
        let mut collector = RequestCollector::new(&ServerConfig::default());
        let mut cursor = BufferCursor::from(&b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n"[..]);

        let Dispatch::Ready(first, _) = controller.start(&mut collector, &mut cursor).unwrap() else {
            panic!("first request not ready");
        };
        assert_eq!(first.target(), "/a");

        let busy = controller.start(&mut collector, &mut cursor).unwrap_err();
        assert!(matches!(busy, HttpError::ConnectionError { source: ConnectionError::Busy }));

        assert!(controller.complete(&ready_observer(), true));
        let Dispatch::Ready(second, _) = controller.start(&mut collector, &mut cursor).unwrap() else {
            panic!("second request not ready");
        };
        assert_eq!(second.target(), "/b");
        assert_eq!(controller.served(), 1);
    }

    #[test]
    fn closing_response_ends_the_connection() {
        let mut controller = ConnectionController::new();
        let mut collector = RequestCollector::new(&ServerConfig::default());
        let mut cursor = BufferCursor::from(&b"GET / HTTP/1.0\r\n\r\n"[..]);

        controller.start(&mut collector, &mut cursor).unwrap();
        assert!(!controller.complete(&ready_observer(), false));
        assert!(controller.is_closed());
        assert!(controller.start(&mut collector, &mut cursor).is_err());
    }

    #[test]
    fn cancel_makes_reads_fatal() {
        let mut controller = ConnectionController::new();
        let mut collector = RequestCollector::new(&ServerConfig::default());
        let mut cursor = BufferCursor::from(&b"GET / HT"[..]);

        controller.start(&mut collector, &mut cursor).unwrap();
        controller.select().unwrap();
        controller.cancel(&mut cursor);
        assert!(controller.is_closed());

        let mut collector = RequestCollector::new(&ServerConfig::default());
        assert!(matches!(collector.consume(&mut cursor), Err(ParseError::Closed)));
    }

    #[test]
    fn parse_fault_closes() {
        let mut controller = ConnectionController::new();
        let mut collector = RequestCollector::new(&ServerConfig::default());
        let mut cursor = BufferCursor::from(&b"GET / HTTP/2.0\r\n\r\n"[..]);

        let error = controller.start(&mut collector, &mut cursor).unwrap_err();
        assert!(matches!(error, HttpError::RequestError { source: ParseError::InvalidVersion { major: 2, minor: 0 } }));
        assert!(controller.is_closed());
    }
}
