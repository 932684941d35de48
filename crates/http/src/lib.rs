//! An embeddable HTTP/1.x wire engine on tokio.
//!
//! The crate covers what happens between an accepted socket and an
//! application handler:
//!
//! - transport detection: plain HTTP, TLS, and PROXY protocol v1 / v2
//!   preambles sent by load balancers, classified before the HTTP layer
//!   reads a byte
//! - an incremental request parser that survives any fragmentation of the
//!   incoming bytes and never waits for more
//! - response body framing chosen from the finalized head: chunked, fixed
//!   length, connection close, or empty, with keep-alive and pipelining
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use wire_http::config::ServerConfig;
//! use wire_http::connection::HttpConnection;
//! use wire_http::handler::make_handler;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let config = ServerConfig::builder().max_body_bytes(64 * 1024).build();
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!         let config = config.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::with_config(reader, writer, config).with_peer(remote_addr);
//!             if let Err(e) = connection.process(handler).await {
//!                 error!("service has error, cause {}, connection shutdown", e);
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<Bytes>) -> Result<Response<String>, Infallible> {
//!     info!(path = request.uri().path(), body = request.body().len(), "receiving request");
//!     let mut response = Response::new(String::from("Hello World!\r\n"));
//!     *response.status_mut() = StatusCode::OK;
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`transport`]: byte cursors, the transport probe, PROXY protocol readers
//! - [`codec`]: the header parser, body decoders, response encoder and producers
//! - [`protocol`]: request and response types, framing rules, errors
//! - [`connection`]: the lifecycle state machine and the tokio driver
//! - [`handler`]: the application trait
//! - [`config`]: connection limits
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - TLS connections are detected but not terminated
//! - Request bodies are collected whole before the handler runs

pub mod codec;
pub mod config;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
