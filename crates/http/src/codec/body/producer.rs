//! The collaborators a response body is written through.

use crate::protocol::SendError;
use std::fmt;

/// Byte sink of a connection. Bytes sent are buffered until flushed.
pub trait Sender {
    fn send(&mut self, data: &[u8]) -> Result<(), SendError>;

    fn flush(&mut self) -> Result<(), SendError>;

    fn close(&mut self) -> Result<(), SendError>;
}

/// Learns how a response ended so the connection can pick the next request
/// or shut down. Crosses task boundaries, so every method takes `&self`.
///
/// Once `ready`, `close` or `error` has been signalled the response is closed
/// and further signals are ignored.
pub trait Observer: Send + Sync + fmt::Debug {
    /// The response is complete and the connection may be reused.
    fn ready(&self, sender: &mut dyn Sender);

    /// The response is complete and the connection must be closed.
    fn close(&self, sender: &mut dyn Sender);

    /// Sending failed, the connection must be closed.
    fn error(&self, sender: &mut dyn Sender);

    /// The response head went out and can no longer change.
    fn commit(&self, sender: &mut dyn Sender);

    fn is_closed(&self) -> bool;

    fn is_committed(&self) -> bool;

    fn is_error(&self) -> bool;
}

/// Frames response body bytes for the wire.
pub trait Producer {
    fn produce(&mut self, data: &[u8]) -> Result<(), SendError>;

    fn flush(&mut self) -> Result<(), SendError>;

    /// Finishes the body and signals the observer.
    fn close(&mut self) -> Result<(), SendError>;
}
