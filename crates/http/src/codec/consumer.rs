use crate::protocol::ParseError;
use crate::transport::ByteCursor;

/// An incremental parser fed from a [`ByteCursor`].
///
/// `consume` never waits for bytes: it takes what the cursor has ready,
/// keeps any partial token, and returns. Bytes past the end of the message
/// are pushed back onto the cursor for whoever reads next.
pub trait Consumer {
    fn consume<C: ByteCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<(), ParseError>;

    fn is_finished(&self) -> bool;
}

/// Size of the scratch chunk consumers read through.
pub(crate) const CHUNK_SIZE: usize = 1024;
