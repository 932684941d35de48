//! The rules that tie a response's framing to the request it answers.

use http::header::{self, HeaderValue};
use http::{Method, StatusCode, Version};

use super::{RequestHeader, ResponseHead};

const KEEP_ALIVE: HeaderValue = HeaderValue::from_static("keep-alive");
const CLOSE: HeaderValue = HeaderValue::from_static("close");
const CHUNKED: HeaderValue = HeaderValue::from_static("chunked");
const UPGRADE: HeaderValue = HeaderValue::from_static("upgrade");

/// What the response side needs to remember about a request once its header
/// has been handed to the application.
#[derive(Debug, Clone)]
pub struct RequestSummary {
    method: Method,
    major: u8,
    minor: u8,
    connection: Option<String>,
    upgrade: Option<String>,
}

impl RequestSummary {
    pub fn new(method: Method, major: u8, minor: u8) -> Self {
        Self { method, major, minor, connection: None, upgrade: None }
    }

    #[must_use]
    pub fn with_connection(mut self, token: &str) -> Self {
        self.connection = Some(token.to_owned());
        self
    }

    #[must_use]
    pub fn with_upgrade(mut self, token: &str) -> Self {
        self.upgrade = Some(token.to_owned());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The version the response is written with.
    pub fn version(&self) -> Version {
        if self.major == 1 && self.minor == 0 { Version::HTTP_10 } else { Version::HTTP_11 }
    }
}

impl From<&RequestHeader> for RequestSummary {
    fn from(header: &RequestHeader) -> Self {
        Self {
            method: header.method().clone(),
            major: header.major(),
            minor: header.minor(),
            connection: header.value(header::CONNECTION).map(str::to_owned),
            upgrade: header.value(header::UPGRADE).map(str::to_owned),
        }
    }
}

/// A request and the response being prepared for it.
#[derive(Debug)]
pub struct Conversation<'a> {
    request: &'a RequestSummary,
    response: &'a mut ResponseHead,
}

impl<'a> Conversation<'a> {
    pub fn new(request: &'a RequestSummary, response: &'a mut ResponseHead) -> Self {
        Self { request, response }
    }

    pub fn request(&self) -> &RequestSummary {
        self.request
    }

    pub fn response(&self) -> &ResponseHead {
        self.response
    }

    /// The response `Content-Length`, `None` when absent or unreadable.
    pub fn content_length(&self) -> Option<u64> {
        self.response_value(header::CONTENT_LENGTH).and_then(|value| value.trim().parse().ok())
    }

    /// 204 and 304 responses never carry a body.
    pub fn is_empty(&self) -> bool {
        matches!(self.response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED)
    }

    pub fn is_head(&self) -> bool {
        self.request.method == Method::HEAD
    }

    pub fn is_connect(&self) -> bool {
        self.request.method == Method::CONNECT
    }

    /// Whether the client asked for, or defaults to, a persistent connection.
    pub fn is_persistent(&self) -> bool {
        if let Some(token) = &self.request.connection {
            return token.eq_ignore_ascii_case("keep-alive");
        }
        self.request.major > 1 || (self.request.major == 1 && self.request.minor > 0)
    }

    /// The response `Connection` header wins over the request's wishes.
    pub fn is_keep_alive(&self) -> bool {
        match self.response_value(header::CONNECTION) {
            Some(token) => !token.eq_ignore_ascii_case("close"),
            None => self.is_persistent(),
        }
    }

    /// Chunked encoding needs an HTTP/1.1 client.
    pub fn is_chunkable(&self) -> bool {
        self.request.major >= 1 && self.request.minor >= 1
    }

    pub fn is_chunked_encoded(&self) -> bool {
        self.response_value(header::TRANSFER_ENCODING).is_some_and(|token| token.eq_ignore_ascii_case("chunked"))
    }

    pub fn is_websocket(&self) -> bool {
        let Some(token) = &self.request.upgrade else {
            return false;
        };
        if self.response.status() != StatusCode::SWITCHING_PROTOCOLS || !token.eq_ignore_ascii_case("websocket") {
            return false;
        }
        self.response_value(header::UPGRADE).is_some_and(|reply| token.eq_ignore_ascii_case(reply))
    }

    /// After a 2xx reply to CONNECT, or a WebSocket upgrade, the connection
    /// carries raw bytes until closed.
    pub fn is_tunnel(&self) -> bool {
        self.is_websocket() || (self.response.status().is_success() && self.is_connect())
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.set_connection_token();
        let headers = self.response.headers_mut();
        headers.remove(header::TRANSFER_ENCODING);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    /// Chunked for keep-alive HTTP/1.1 exchanges, otherwise the body is
    /// delimited by closing the connection.
    pub fn set_chunked_encoded(&mut self) {
        let keep_alive = self.is_keep_alive();
        let chunkable = self.is_chunkable();
        let headers = self.response.headers_mut();

        if keep_alive && chunkable {
            headers.insert(header::TRANSFER_ENCODING, CHUNKED);
            headers.insert(header::CONNECTION, KEEP_ALIVE);
        } else {
            headers.remove(header::TRANSFER_ENCODING);
            headers.insert(header::CONNECTION, CLOSE);
        }
    }

    pub fn set_connection_upgrade(&mut self) {
        let headers = self.response.headers_mut();
        headers.remove(header::TRANSFER_ENCODING);
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::CONNECTION, UPGRADE);
    }

    pub fn set_identity_encoded(&mut self) {
        self.response.headers_mut().remove(header::TRANSFER_ENCODING);
    }

    /// Finalizes the framing headers before the response head is encoded.
    ///
    /// `body_length` is the exact body size when known up front. A HEAD
    /// response sends no body, so a `Content-Length` the application set
    /// describes the entity it would have sent and is kept.
    pub fn configure(&mut self, body_length: Option<u64>) {
        let declared = self.content_length();
        let length = match body_length {
            Some(count) if self.is_head() && count == 0 => declared,
            Some(count) => Some(count),
            None => declared,
        };

        if self.is_tunnel() {
            self.set_connection_upgrade();
        } else if self.is_empty() {
            self.set_content_length(0);
        } else if let Some(length) = length {
            self.set_content_length(length);
        } else {
            self.set_chunked_encoded();
        }
    }

    fn set_connection_token(&mut self) {
        let token = if self.is_keep_alive() { KEEP_ALIVE } else { CLOSE };
        self.response.headers_mut().insert(header::CONNECTION, token);
    }

    fn response_value(&self, name: header::HeaderName) -> Option<&str> {
        self.response.headers().get(name).and_then(|value| value.to_str().ok())
    }
}
