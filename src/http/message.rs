use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::http::headers::{HeaderTable, KeyValue};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";

/// Body, content type and headers shared by requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub body: Bytes,
    pub content_type: String,
    pub headers: HeaderTable,
}

impl Message {
    /// Builds a message, synthesizing `Content-Type` from `content_type`
    /// unless the caller already set that header.
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>, headers: HeaderTable) -> Self {
        let mut message = Self {
            body: body.into(),
            content_type: content_type.into(),
            headers,
        };
        if !message.content_type.is_empty() {
            message.headers.add(CONTENT_TYPE, message.content_type.clone());
        }
        message
    }
}

/// Accessors common to [`Request`](crate::Request) and
/// [`Response`](crate::Response).
pub trait HttpMessage {
    fn message(&self) -> &Message;
    fn message_mut(&mut self) -> &mut Message;

    fn body(&self) -> &[u8] {
        &self.message().body
    }

    /// Body as text; invalid UTF-8 is replaced.
    fn text(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(self.body())
    }

    fn content_type(&self) -> &str {
        &self.message().content_type
    }

    fn headers(&self) -> &HeaderTable {
        &self.message().headers
    }

    fn header(&self, name: &str) -> Option<&KeyValue> {
        self.message().headers.get(name)
    }

    fn has_header(&self, name: &str) -> bool {
        self.message().headers.contains(name)
    }

    /// First-wins: an existing header of the same name is kept.
    fn add_header(&mut self, name: impl Into<String>, value: impl std::fmt::Display) -> bool
    where
        Self: Sized,
    {
        self.message_mut().headers.add(name, value)
    }

    /// Adds `Content-Length` for a non-empty body if none is set.
    fn calculate_content_length(&mut self) {
        let message = self.message_mut();
        if !message.body.is_empty() {
            let len = message.body.len();
            message.headers.add(CONTENT_LENGTH, len);
        }
    }
}
