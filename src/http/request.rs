use std::fmt::Display;

use bytes::Bytes;

use crate::error::ParseError;
use crate::http::headers::HeaderTable;
use crate::http::message::{HttpMessage, Message, TEXT_PLAIN};
use crate::http::query::{ArgTable, parse_query};

/// An HTTP request.
///
/// The method is kept as sent; it is only compared case-insensitively when
/// the server dispatches it. The query string never lives in `resource`:
/// it is split off at construction and kept decoded in `args`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    resource: String,
    args: ArgTable,
    message: Message,
}

impl Request {
    /// Shorthand for a body-less request.
    pub fn new(method: impl Into<String>, resource: impl AsRef<str>) -> Self {
        RequestBuilder::new(method, resource).build()
    }

    pub fn builder(method: impl Into<String>, resource: impl AsRef<str>) -> RequestBuilder {
        RequestBuilder::new(method, resource)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Case-insensitive method comparison.
    pub fn is_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }

    /// Path without the query string.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn args(&self) -> &ArgTable {
        &self.args
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.value(name)
    }

    /// Resource with the re-encoded query string, as put on the wire.
    pub fn target(&self) -> String {
        format!("{}{}", self.resource, self.args)
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

/// Builder for [`Request`] values.
///
/// Arguments parsed out of the resource's query string come first; args
/// added with [`RequestBuilder::arg`] follow, first value winning.
pub struct RequestBuilder {
    method: String,
    resource: String,
    args: ArgTable,
    headers: HeaderTable,
    body: Bytes,
    content_type: String,
}

impl RequestBuilder {
    /// Starts a request for `resource`. A query string that does not decode
    /// to UTF-8 is left in the resource untouched.
    pub fn new(method: impl Into<String>, resource: impl AsRef<str>) -> Self {
        let resource = resource.as_ref();
        let (resource, args) =
            parse_query(resource).unwrap_or_else(|_| (resource.to_string(), ArgTable::new()));
        Self::with_parts(method.into(), resource, args)
    }

    /// Like [`RequestBuilder::new`], but rejects an undecodable query.
    pub fn from_target(method: impl Into<String>, target: &str) -> Result<Self, ParseError> {
        let (resource, args) = parse_query(target)?;
        Ok(Self::with_parts(method.into(), resource, args))
    }

    fn with_parts(method: String, resource: String, args: ArgTable) -> Self {
        Self {
            method,
            resource,
            args,
            headers: HeaderTable::new(),
            body: Bytes::new(),
            content_type: String::new(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.args.add(name, value);
        self
    }

    pub fn args(mut self, args: &ArgTable) -> Self {
        for arg in args {
            self.args.add(arg.name(), arg.value());
        }
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderTable) -> Self {
        for header in &headers {
            self.headers.add(header.name(), header.value());
        }
        self
    }

    /// Sets the body together with its content type.
    pub fn body(mut self, body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = body.into();
        self.content_type = content_type.into();
        self
    }

    /// Sets a `text/plain` body.
    pub fn text(self, body: impl Into<String>) -> Self {
        self.body(body.into(), TEXT_PLAIN)
    }

    pub fn json<T: serde::Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self.body(body, crate::http::message::APPLICATION_JSON))
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            resource: self.resource,
            args: self.args,
            message: Message::new(self.body, self.content_type, self.headers),
        }
    }
}
