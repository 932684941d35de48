//! Core HTTP protocol abstractions.
//!
//! # Architecture
//!
//! - **Message Handling**: payload items and framing sizes
//!   - [`PayloadItem`]: a body chunk or the end of the body
//!   - [`PayloadSize`]: how a body is delimited on the wire
//!
//! - **Request Processing**: the parsed request header
//!   - [`RequestHeader`]: typed accessors over the header fields
//!   - [`Query`], [`Path`], [`Cookie`]: decoded parts of the request
//!   - [`quality`]: `q` ordered header lists
//!
//! - **Response Processing**
//!   - [`ResponseHead`]: the response before its body is attached
//!   - [`Conversation`]: finalizes keep-alive and body framing headers
//!
//! - **Error Handling**
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: Request parsing errors, raised per phase
//!   - [`SendError`]: Response sending errors
//!   - [`ProbeError`]: Transport detection errors
//!   - [`ValueError`]: Malformed header values
//!   - [`ConnectionError`]: Lifecycle violations

mod message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod conversation;
pub use conversation::Conversation;
pub use conversation::RequestSummary;

mod cookie;
pub use cookie::Cookie;
pub use cookie::Cookies;

mod date;
pub use date::format_http_date;
pub use date::parse_http_date;

mod path;
pub use path::Path;

mod query;
pub use query::Query;

pub mod quality;

mod error;
pub use error::ConnectionError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::ParsePhase;
pub use error::ProbeError;
pub use error::SendError;
pub use error::ValueError;
