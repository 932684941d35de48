//! Connection lifecycle.
//!
//! # Components
//!
//! - [`HttpConnection`]: the tokio driver of one accepted connection
//! - [`ConnectionController`]: the start / select / ready / stop state machine
//! - [`RequestCollector`]: collects a request header and its body
//! - [`ResponseObserver`]: learns how each response ended
//! - [`ConnectionSender`]: buffers outgoing bytes between socket writes
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use wire_http::connection::HttpConnection;
//! use wire_http::handler::make_handler;
//!
//! # async fn serve() -> std::io::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! let handler = Arc::new(make_handler(|_request: Request<Bytes>| async {
//!     Ok::<_, Infallible>(Response::new(String::from("hello")))
//! }));
//!
//! loop {
//!     let (stream, peer) = listener.accept().await?;
//!     let handler = Arc::clone(&handler);
//!     tokio::spawn(async move {
//!         let (reader, writer) = stream.into_split();
//!         let _ = HttpConnection::new(reader, writer).with_peer(peer).process(handler).await;
//!     });
//! }
//! # }
//! ```

mod collector;
mod controller;
mod http_connection;
mod observer;
mod sender;

pub use collector::RequestCollector;
pub use controller::{ConnectionController, ControllerState, Dispatch};
pub use http_connection::HttpConnection;
pub use observer::ResponseObserver;
pub use sender::ConnectionSender;
