use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{Method, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, error, info, trace, warn};

use super::{ConnectionController, ConnectionSender, Dispatch, RequestCollector, ResponseObserver};
use crate::codec::{HeaderEncoder, Observer, Producer, ProducerFactory};
use crate::config::ServerConfig;
use crate::handler::Handler;
use crate::protocol::{
    ConnectionError, Conversation, HttpError, ParseError, RequestHeader, RequestSummary, ResponseHead, SendError,
    format_http_date,
};
use crate::transport::proxy::ClientAddress;
use crate::transport::{BufferCursor, ByteCursor, TransportProbe, TransportType};

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Drives one accepted connection.
///
/// The connection first classifies the transport, skipping any PROXY
/// preamble, then serves requests one at a time: each request is collected
/// whole, handed to the [`Handler`], and its response framed by the producer
/// the response head calls for. The next pipelined request is read only once
/// the previous response completed.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    reader: R,
    writer: W,
    config: ServerConfig,
    cursor: BufferCursor,
    sender: ConnectionSender,
    probe: TransportProbe,
    controller: ConnectionController,
    collector: RequestCollector,
    encoder: HeaderEncoder,
    client: Option<ClientAddress>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, ServerConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: ServerConfig) -> Self {
        Self {
            reader,
            writer,
            cursor: BufferCursor::with_capacity(config.read_buffer_size()),
            sender: ConnectionSender::with_capacity(config.read_buffer_size()),
            probe: TransportProbe::with_capacity(config.probe_capacity()),
            controller: ConnectionController::new(),
            collector: RequestCollector::new(&config),
            encoder: HeaderEncoder,
            client: None,
            config,
        }
    }

    /// The socket peer, replaced by the PROXY source address when a preamble is present.
    #[must_use]
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.client = Some(ClientAddress::from(peer));
        self
    }

    pub fn client_address(&self) -> Option<&ClientAddress> {
        self.client.as_ref()
    }

    pub fn transport_type(&self) -> TransportType {
        self.probe.transport_type()
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        match self.negotiate().await {
            Ok(TransportType::Plain) => {}
            Ok(TransportType::Secure) => {
                info!("secure transport detected, closing connection");
                self.shutdown().await;
                return Err(ConnectionError::SecureUnsupported.into());
            }
            Ok(TransportType::Unknown) => {
                debug!("connection closed before the transport was known");
                return Ok(());
            }
            Err(e) => {
                warn!(cause = %e, "transport negotiation failed");
                self.shutdown().await;
                return Err(e);
            }
        }

        loop {
            let (header, body) = match self.next_request().await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    info!(served = self.controller.served(), "cant read more request, break this connection down");
                    return Ok(());
                }
                Err(e) => return self.reject(e).await,
            };

            let keep_alive = match self.do_process(*header, body, &handler).await {
                Ok(keep_alive) => keep_alive,
                Err(e) => {
                    self.controller.stop();
                    self.shutdown().await;
                    return Err(e);
                }
            };

            if !keep_alive {
                self.shutdown().await;
                return Ok(());
            }
        }
    }

    /// Reads until the transport is classified, `Unknown` when the peer left first.
    async fn negotiate(&mut self) -> Result<TransportType, HttpError> {
        loop {
            let transport = self.probe.probe(self.cursor.buffer_mut())?;
            if transport != TransportType::Unknown {
                if let Some(header) = self.probe.header() {
                    let source = header.source();
                    debug!(address = source.address(), port = source.port(), "proxy preamble received");
                    self.client = Some(ClientAddress::from(source));
                }
                return Ok(transport);
            }

            if self.fill().await? == 0 {
                return Ok(TransportType::Unknown);
            }
        }
    }

    /// Collects the next request, `None` when the peer closed between requests.
    async fn next_request(&mut self) -> Result<Option<(Box<RequestHeader>, Bytes)>, HttpError> {
        let mut dispatch = self.controller.start(&mut self.collector, &mut self.cursor)?;
        loop {
            match dispatch {
                Dispatch::Ready(header, body) => return Ok(Some((header, body))),
                Dispatch::Select => {
                    if self.collector.take_expect_continue() {
                        self.send_continue().await?;
                    }

                    self.controller.select()?;
                    if self.fill().await? == 0 && !self.collector.is_started() {
                        self.controller.stop();
                        return Ok(None);
                    }
                    dispatch = self.controller.readable(&mut self.collector, &mut self.cursor)?;
                }
            }
        }
    }

    /// Reads from the socket into the cursor, closing the cursor at end of stream.
    async fn fill(&mut self) -> Result<usize, HttpError> {
        let timeout = self.config.read_timeout();
        let buffer = self.cursor.buffer_mut();
        buffer.reserve(self.config.read_buffer_size());

        let result = tokio::time::timeout(timeout, self.reader.read_buf(buffer)).await;
        match result {
            Ok(Ok(0)) => {
                trace!("peer closed its write side");
                self.cursor.close();
                Ok(0)
            }
            Ok(Ok(count)) => {
                trace!(count, "read bytes from socket");
                Ok(count)
            }
            Ok(Err(e)) => Err(ParseError::io(e).into()),
            Err(_elapsed) => {
                warn!(timeout = ?timeout, "read timed out, cancel connection");
                self.controller.cancel(&mut self.cursor);
                Err(ConnectionError::Timeout { millis: timeout.as_millis() }.into())
            }
        }
    }

    async fn do_process<H>(&mut self, header: RequestHeader, body: Bytes, handler: &Arc<H>) -> Result<bool, HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let summary = RequestSummary::from(&header);
        let mut request = header.body(body);
        if let Some(client) = &self.client {
            request.extensions_mut().insert(client.clone());
        }

        match handler.call(request).await {
            Ok(response) => self.send_response(&summary, response).await,
            Err(e) => {
                let cause: Box<dyn std::error::Error + Send + Sync> = e.into();
                error!(%cause, "handle response error");
                self.send_response(&summary, build_error_response(StatusCode::INTERNAL_SERVER_ERROR)).await
            }
        }
    }

    /// Writes a response, returns whether the connection stays open.
    async fn send_response<T>(&mut self, summary: &RequestSummary, response: Response<T>) -> Result<bool, HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
    {
        let (parts, mut body) = response.into_parts();
        let mut head = ResponseHead::from_parts(parts, ());
        *head.version_mut() = summary.version();
        if !head.headers().contains_key(header::DATE)
            && let Ok(date) = HeaderValue::try_from(format_http_date(SystemTime::now()))
        {
            head.headers_mut().insert(header::DATE, date);
        }

        let mut conversation = Conversation::new(summary, &mut head);
        conversation.configure(body.size_hint().exact());
        let keep_alive = conversation.is_keep_alive() && !conversation.is_tunnel();
        let factory = ProducerFactory::new(&conversation);

        let observer = ResponseObserver::new();
        self.encoder.encode(&head, self.sender.buffer_mut())?;
        observer.commit(&mut self.sender);

        let mut producer = factory.producer(&mut self.sender, &observer);
        loop {
            let frame = match body.frame().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    observer.error(producer.sender_mut());
                    return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into());
                }
                None => break,
            };

            let Ok(data) = frame.into_data() else {
                continue;
            };
            producer.produce(&data)?;
            producer.flush()?;
            if let Err(e) = drain(&mut self.writer, producer.sender_mut()).await {
                observer.abort(producer.sender_mut());
                return Err(e.into());
            }
        }

        producer.close()?;
        if let Err(e) = drain(&mut self.writer, producer.sender_mut()).await {
            observer.abort(producer.sender_mut());
            return Err(e.into());
        }
        Ok(self.controller.complete(&observer, keep_alive))
    }

    async fn send_continue(&mut self) -> Result<(), HttpError> {
        self.writer.write_all(CONTINUE).await.map_err(SendError::io)?;
        self.writer.flush().await.map_err(SendError::io)?;
        info!("receive expect request header, sent continue response");
        Ok(())
    }

    /// Answers protocol faults with `400 Bad Request`, then closes.
    async fn reject(&mut self, e: HttpError) -> Result<(), HttpError> {
        let protocol_fault = matches!(&e, HttpError::RequestError { source } if source.is_protocol_fault());
        if protocol_fault {
            error!(cause = %e, "can't receive next request");
            let summary = RequestSummary::new(Method::GET, 1, 1).with_connection("close");
            let mut response = build_error_response(StatusCode::BAD_REQUEST);
            response.headers_mut().insert(header::CONNECTION, HeaderValue::from_static("close"));
            if let Err(send_error) = self.send_response(&summary, response).await {
                debug!(cause = %send_error, "failed to send bad request response");
            }
        } else {
            debug!(cause = %e, "connection ended while reading a request");
        }

        self.controller.stop();
        self.shutdown().await;
        Err(e)
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.writer.shutdown().await {
            debug!(cause = %e, "failed to shutdown the writer");
        }
    }
}

/// Writes what the producer buffered and honours a requested flush.
async fn drain<W: AsyncWrite + Unpin>(writer: &mut W, sender: &mut ConnectionSender) -> Result<(), SendError> {
    let flush = sender.take_flush() || sender.is_closed();
    if sender.pending() > 0 {
        let bytes = sender.take();
        writer.write_all(&bytes).await.map_err(SendError::io)?;
    }
    if flush {
        writer.flush().await.map_err(SendError::io)?;
    }
    Ok(())
}

fn build_error_response(status_code: StatusCode) -> Response<Empty<Bytes>> {
    let mut response = Response::new(Empty::<Bytes>::new());
    *response.status_mut() = status_code;
    response
}
