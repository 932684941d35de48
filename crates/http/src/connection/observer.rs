use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::codec::{Observer, Sender};

/// The connection side [`Observer`].
///
/// `ready` flushes the sender and leaves the connection open for the next
/// request, `close` and `error` close the sender. Only the first terminal
/// signal counts.
#[derive(Debug)]
pub struct ResponseObserver {
    committed: AtomicBool,
    closed: AtomicBool,
    error: AtomicBool,
    ready: AtomicBool,
    started: Instant,
    finished: OnceCell<Duration>,
}

impl ResponseObserver {
    pub fn new() -> Self {
        Self {
            committed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            error: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            started: Instant::now(),
            finished: OnceCell::new(),
        }
    }

    /// The response finished and the connection can serve the next request.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire) && !self.is_error()
    }

    /// Time between the observer's creation and the terminal signal.
    pub fn elapsed(&self) -> Option<Duration> {
        self.finished.get().copied()
    }

    /// The socket refused the response bytes.
    ///
    /// Unlike [`Observer::error`] this wins over an earlier `ready`: the
    /// producer may have finished before the bytes reached the peer.
    pub fn abort(&self, sender: &mut dyn Sender) {
        warn!("response write failed, closing connection");
        self.closed.store(true, Ordering::Release);
        self.error.store(true, Ordering::Release);
        let _ = self.finished.set(self.started.elapsed());
        Self::fail(sender);
    }

    /// Claims the terminal signal, false when another one came first.
    fn finish(&self, flag: &AtomicBool) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) || self.error.load(Ordering::Acquire) {
            return false;
        }
        flag.store(true, Ordering::Release);
        let _ = self.finished.set(self.started.elapsed());
        true
    }

    fn fail(sender: &mut dyn Sender) {
        if let Err(e) = sender.close() {
            debug!(cause = %e, "failed to close the sender");
        }
    }
}

impl Default for ResponseObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for ResponseObserver {
    fn ready(&self, sender: &mut dyn Sender) {
        if !self.finish(&self.ready) {
            return;
        }
        if let Err(e) = sender.flush() {
            warn!(cause = %e, "failed to flush the finished response");
            self.error.store(true, Ordering::Release);
            Self::fail(sender);
        }
    }

    fn close(&self, sender: &mut dyn Sender) {
        if !self.finish(&self.closed) {
            return;
        }
        if let Err(e) = sender.close() {
            warn!(cause = %e, "failed to close the finished response");
            self.error.store(true, Ordering::Release);
        }
    }

    fn error(&self, sender: &mut dyn Sender) {
        if !self.finish(&self.error) {
            return;
        }
        Self::fail(sender);
    }

    fn commit(&self, _sender: &mut dyn Sender) {
        self.committed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.error.load(Ordering::Acquire)
    }

    fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }

    fn is_error(&self) -> bool {
        self.error.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::testing::RecordingSender;

    #[test]
    fn ready_flushes_and_keeps_open() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();

        observer.ready(&mut sender);
        assert!(observer.is_ready());
        assert!(observer.is_closed());
        assert_eq!(sender.flushes, 1);
        assert!(!sender.closed);
        assert!(observer.elapsed().is_some());
    }

    #[test]
    fn first_terminal_signal_wins() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();

        observer.close(&mut sender);
        observer.ready(&mut sender);
        observer.error(&mut sender);

        assert!(sender.closed);
        assert_eq!(sender.flushes, 0);
        assert!(!observer.is_ready());
        assert!(!observer.is_error());
    }

    #[test]
    fn abort_overrides_ready() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();

        observer.ready(&mut sender);
        assert!(observer.is_ready());

        observer.abort(&mut sender);
        assert!(observer.is_error());
        assert!(!observer.is_ready());
        assert!(sender.closed);
    }

    #[test]
    fn error_closes_the_sender() {
        let observer = ResponseObserver::new();
        let mut sender = RecordingSender::default();

        observer.commit(&mut sender);
        observer.error(&mut sender);

        assert!(observer.is_committed());
        assert!(observer.is_error());
        assert!(observer.is_closed());
        assert!(sender.closed);
    }
}
