use std::fmt;

use bytes::Bytes;

use crate::http::headers::HeaderTable;
use crate::http::message::{APPLICATION_JSON, HttpMessage, Message, TEXT_PLAIN};

/// Numeric HTTP status code.
///
/// Any value is representable; the associated constants cover the codes
/// this crate produces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const METHOD_NOT_ALLOWED: StatusCode = StatusCode(405);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Standard reason phrase, `None` for unrecognized codes.
    ///
    /// ```
    /// # use coolipc::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), Some("OK"));
    /// assert_eq!(StatusCode(299).reason_phrase(), None);
    /// ```
    pub fn reason_phrase(&self) -> Option<&'static str> {
        let phrase = match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Request Entity Too Large",
            414 => "Request-URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Requested Range Not Satisfiable",
            417 => "Expectation Failed",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",
            _ => return None,
        };
        Some(phrase)
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    reason: Option<String>,
    message: Message,
}

impl Response {
    /// Empty-bodied response with the given status.
    pub fn new(status: impl Into<StatusCode>) -> Self {
        ResponseBuilder::new(status).build()
    }

    pub fn builder(status: impl Into<StatusCode>) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// 200 with a `text/plain` body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::text(StatusCode::OK, body)
    }

    pub fn text(status: impl Into<StatusCode>, body: impl Into<String>) -> Self {
        ResponseBuilder::new(status)
            .body(body.into(), TEXT_PLAIN)
            .build()
    }

    pub fn json(status: impl Into<StatusCode>, value: serde_json::Value) -> Self {
        ResponseBuilder::new(status)
            .body(value.to_string(), APPLICATION_JSON)
            .build()
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::text(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// 405 advertising the methods the route does accept.
    pub fn method_not_allowed<S: AsRef<str>>(allowed: &[S]) -> Self {
        let allow = allowed
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(", ");
        ResponseBuilder::new(StatusCode::METHOD_NOT_ALLOWED)
            .header("Allow", allow)
            .build()
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::text(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Explicit reason phrase, else the standard one, else `"Unknown"`.
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .or_else(|| self.status.reason_phrase())
            .unwrap_or("Unknown")
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

impl From<serde_json::Value> for Response {
    fn from(value: serde_json::Value) -> Self {
        Response::json(StatusCode::OK, value)
    }
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::OK)
///     .header("Cache-Control", "no-cache")
///     .body("{}", "application/json")
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderTable,
    body: Bytes,
    content_type: String,
}

impl ResponseBuilder {
    pub fn new(status: impl Into<StatusCode>) -> Self {
        Self {
            status: status.into(),
            reason: None,
            headers: HeaderTable::new(),
            body: Bytes::new(),
            content_type: String::new(),
        }
    }

    /// Overrides the reason phrase derived from the status code.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Adds a header; a header of the same name added earlier wins.
    pub fn header(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.headers.add(key, value);
        self
    }

    pub fn headers(mut self, headers: HeaderTable) -> Self {
        for header in &headers {
            self.headers.add(header.name(), header.value());
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = body.into();
        self.content_type = content_type.into();
        self
    }

    /// Builds the final Response.
    ///
    /// Adds `Content-Type` from the content type and `Content-Length` from a
    /// non-empty body, unless those headers were set explicitly.
    pub fn build(self) -> Response {
        let mut response = Response {
            status: self.status,
            reason: self.reason,
            message: Message::new(self.body, self.content_type, self.headers),
        };
        response.calculate_content_length();
        response
    }
}
