//! HTTP request header handling implementation.
//!
//! [`RequestHeader`] wraps the standard `http::Request<()>` and adds what the
//! wire parser knows beyond it: the raw target, the protocol digits, cookies,
//! lazily decoded query and path, and typed header accessors.

use std::time::SystemTime;

use http::header::{self, AsHeaderName, HeaderName};
use http::{HeaderMap, HeaderValue, Method, Request, Uri, Version};
use mime::Mime;
use once_cell::sync::OnceCell;

use super::cookie::{Cookie, Cookies};
use super::date::parse_http_date;
use super::path::Path;
use super::query::Query;
use super::{ParseError, PayloadSize, ValueError, quality};

/// Represents an HTTP request header, immutable once parsed.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
    target: String,
    major: u8,
    minor: u8,
    cookies: Cookies,
    query: OnceCell<Query>,
    path: OnceCell<Path>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl RequestHeader {
    pub(crate) fn new(method: Method, uri: Uri, target: String, major: u8, minor: u8, headers: HeaderMap) -> Self {
        let mut inner = Request::new(());
        *inner.method_mut() = method;
        *inner.uri_mut() = uri;
        *inner.version_mut() = if minor == 0 { Version::HTTP_10 } else { Version::HTTP_11 };
        *inner.headers_mut() = headers;

        let cookies = Cookies::parse(inner.headers().get_all(header::COOKIE).iter().filter_map(|v| v.to_str().ok()));
        Self { inner, target, major, minor, cookies, query: OnceCell::new(), path: OnceCell::new() }
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    ///
    /// The cookies travel along as a [`Cookies`] request extension.
    pub fn body<T>(self, body: T) -> Request<T> {
        let mut request = self.inner.map(|_| body);
        request.extensions_mut().insert(self.cookies);
        request
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// The request target exactly as it appeared on the request line.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn major(&self) -> u8 {
        self.major
    }

    pub fn minor(&self) -> u8 {
        self.minor
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Header names in the order they were first seen.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.headers().keys().map(HeaderName::as_str)
    }

    /// The first value of `name`, `None` when absent or not visible ASCII.
    pub fn value<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// Every raw value of `name` in arrival order.
    pub fn all<K: AsHeaderName>(&self, name: K) -> impl Iterator<Item = &str> {
        self.headers().get_all(name).into_iter().filter_map(|value| value.to_str().ok())
    }

    /// The comma separated tokens of every `name` value, ordered by quality.
    pub fn values<K: AsHeaderName>(&self, name: K) -> Vec<String> {
        quality::ordered(self.all(name))
    }

    /// `Ok(None)` when absent, an error when present but not an integer.
    pub fn integer(&self, name: &str) -> Result<Option<i64>, ValueError> {
        let Some(text) = self.text(name)? else {
            return Ok(None);
        };

        text.trim()
            .parse()
            .map(Some)
            .map_err(|_e| ValueError::InvalidInteger { name: name.to_owned(), value: text.to_owned() })
    }

    /// `Ok(None)` when absent, an error when present but not an HTTP date.
    pub fn date(&self, name: &str) -> Result<Option<SystemTime>, ValueError> {
        let Some(text) = self.text(name)? else {
            return Ok(None);
        };

        parse_http_date(text)
            .map(Some)
            .ok_or_else(|| ValueError::InvalidDate { name: name.to_owned(), value: text.to_owned() })
    }

    fn text(&self, name: &str) -> Result<Option<&str>, ValueError> {
        self.headers()
            .get(name)
            .map(HeaderValue::to_str)
            .transpose()
            .map_err(|_e| ValueError::NotText { name: name.to_owned() })
    }

    pub fn content_type(&self) -> Option<Mime> {
        self.value(header::CONTENT_TYPE).and_then(|value| value.parse().ok())
    }

    pub fn content_length(&self) -> Option<u64> {
        self.value(header::CONTENT_LENGTH).and_then(|value| value.trim().parse().ok())
    }

    /// Whether chunked is the final transfer coding.
    pub fn is_chunked(&self) -> bool {
        is_chunked(self.headers().get(header::TRANSFER_ENCODING))
    }

    /// `Expect: 100-continue` from an HTTP/1.1 client, HTTP/1.0 clients never get an interim response.
    pub fn is_expect_continue(&self) -> bool {
        self.version() == Version::HTTP_11
            && self.value(header::EXPECT).is_some_and(|value| value.trim().eq_ignore_ascii_case("100-continue"))
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }

    /// The decoded query parameters, parsed on first access.
    pub fn query(&self) -> &Query {
        self.query.get_or_init(|| Query::from(self.uri().query().unwrap_or_default()))
    }

    /// The decoded path, parsed on first access.
    pub fn path(&self) -> &Path {
        self.path.get_or_init(|| Path::from(self.uri().path()))
    }

    /// Determines if this request requires a body based on its HTTP method.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// How the request body is framed.
    ///
    /// refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding>
    pub fn payload_size(&self) -> Result<PayloadSize, ParseError> {
        let te_header = self.headers().get(header::TRANSFER_ENCODING);
        let cl_header = self.headers().get(header::CONTENT_LENGTH);

        match (te_header, cl_header) {
            (None, None) => Ok(PayloadSize::Empty),

            (te_value @ Some(_), None) => {
                if is_chunked(te_value) {
                    Ok(PayloadSize::Chunked)
                } else if self.need_body() {
                    Err(ParseError::invalid_body("transfer-encoding without chunked as final coding"))
                } else {
                    Ok(PayloadSize::Empty)
                }
            }

            (None, Some(_)) => {
                let mut lengths = self.headers().get_all(header::CONTENT_LENGTH).iter().map(|value| {
                    let text = value.to_str().map_err(ParseError::invalid_content_length)?;
                    text.trim()
                        .parse::<u64>()
                        .map_err(|e| ParseError::invalid_content_length(format!("value {text} is not u64: {e}")))
                });

                let length = lengths.next().unwrap_or(Ok(0))?;
                for other in lengths {
                    if other? != length {
                        return Err(ParseError::invalid_content_length("conflicting content-length values"));
                    }
                }

                Ok(if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) })
            }

            (Some(_), Some(_)) => {
                Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
            }
        }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    fn from(inner: Request<()>) -> Self {
        let (parts, ()) = inner.into_parts();
        let minor = u8::from(parts.version != Version::HTTP_10);
        let target = parts.uri.to_string();
        Self::new(parts.method, parts.uri, target, 1, minor, parts.headers)
    }
}

/// According to RFC 7230, chunked must be the last encoding if present.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    header_value
        .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
        .is_some_and(|bytes| bytes.trim_ascii().eq_ignore_ascii_case(CHUNKED))
}
