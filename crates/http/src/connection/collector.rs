use std::mem;

use bytes::Bytes;
use tracing::debug;

use crate::codec::{BodyConsumer, Consumer, HeaderConsumer};
use crate::config::ServerConfig;
use crate::protocol::{ParseError, RequestHeader};
use crate::transport::ByteCursor;

/// Collects one request: the header first, then its whole body.
#[derive(Debug)]
pub struct RequestCollector {
    header: HeaderConsumer,
    body: Option<BodyConsumer>,
    max_body_bytes: u64,
    expect_continue: bool,
}

impl RequestCollector {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            header: HeaderConsumer::with_limits(config.max_header_bytes(), config.max_headers()),
            body: None,
            max_body_bytes: config.max_body_bytes(),
            expect_continue: false,
        }
    }

    /// Whether any byte of the current request arrived.
    pub fn is_started(&self) -> bool {
        self.header.is_started()
    }

    pub fn is_header_finished(&self) -> bool {
        self.body.is_some()
    }

    /// True once per request when the client waits for `100 Continue`
    /// before sending the body.
    pub fn take_expect_continue(&mut self) -> bool {
        mem::take(&mut self.expect_continue)
    }

    /// Hands out the finished request and prepares for the next one.
    pub fn take_request(&mut self) -> Option<(RequestHeader, Bytes)> {
        if !self.is_finished() {
            return None;
        }

        let header = self.header.take_header()?;
        let body = self.body.take().map(|mut body| body.take_body()).unwrap_or_default();
        self.header.reset();
        self.expect_continue = false;
        Some((header, body))
    }
}

impl Consumer for RequestCollector {
    fn consume<C: ByteCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<(), ParseError> {
        if self.body.is_none() {
            self.header.consume(cursor)?;
            let Some(header) = self.header.header() else {
                return Ok(());
            };

            let size = header.payload_size()?;
            debug!(method = %header.method(), target = header.target(), ?size, "request header collected");
            self.expect_continue = header.is_expect_continue() && !size.is_empty();
            self.body = Some(BodyConsumer::new(size, self.max_body_bytes)?);
        }

        if let Some(body) = &mut self.body {
            body.consume(cursor)?;
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.body.as_ref().is_some_and(Consumer::is_finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferCursor;
    use indoc::indoc;

    #[test]
    fn header_then_body() {
        let request = indoc! {"
            POST /upload HTTP/1.1\r
            Host: localhost\r
            Content-Length: 5\r
            \r
            hello"};
        let mut cursor = BufferCursor::from(request.as_bytes());
        let mut collector = RequestCollector::new(&ServerConfig::default());

        collector.consume(&mut cursor).unwrap();
        assert!(collector.is_finished());

        let (header, body) = collector.take_request().unwrap();
        assert_eq!(header.target(), "/upload");
        assert_eq!(&body[..], b"hello");
        assert!(!collector.is_started());
        assert!(!collector.is_header_finished());
    }

    #[test]
    fn expect_continue_waits_for_body() {
        let request = indoc! {"
            PUT /file HTTP/1.1\r
            Expect: 100-continue\r
            Content-Length: 4\r
            \r
        "};
        let mut cursor = BufferCursor::from(request.as_bytes());
        let mut collector = RequestCollector::new(&ServerConfig::default());

        collector.consume(&mut cursor).unwrap();
        assert!(collector.is_header_finished());
        assert!(!collector.is_finished());
        assert!(collector.take_expect_continue());
        assert!(!collector.take_expect_continue());

        cursor.extend_from_slice(b"data");
        collector.consume(&mut cursor).unwrap();
        assert_eq!(&collector.take_request().unwrap().1[..], b"data");
    }

    #[test]
    fn pipelined_requests_in_order() {
        let requests = indoc! {"
            GET /first HTTP/1.1\r
            \r
            GET /second HTTP/1.1\r
            \r
        "};
        let mut cursor = BufferCursor::from(requests.as_bytes());
        let mut collector = RequestCollector::new(&ServerConfig::default());

        collector.consume(&mut cursor).unwrap();
        assert_eq!(collector.take_request().unwrap().0.target(), "/first");

        collector.consume(&mut cursor).unwrap();
        assert_eq!(collector.take_request().unwrap().0.target(), "/second");
        assert_eq!(cursor.ready(), 0);
    }

    #[test]
    fn body_limit_from_config() {
        let request = "POST / HTTP/1.1\r\nContent-Length: 100\r\n\r\n";
        let mut cursor = BufferCursor::from(request.as_bytes());
        let config = ServerConfig::builder().max_body_bytes(10).build();
        let mut collector = RequestCollector::new(&config);

        assert!(matches!(collector.consume(&mut cursor), Err(ParseError::TooLargeBody { .. })));
    }
}
