//! HTTP response header handling implementation.

use http::Response;

/// The header portion of an HTTP response, before the body is attached.
///
/// [`Conversation`](super::Conversation) finalizes its framing headers, the
/// header encoder serializes it.
pub type ResponseHead = Response<()>;
