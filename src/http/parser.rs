//! Resumable request and response parsers.
//!
//! Both parsers are explicit state machines over a [`ByteStream`]. Each
//! state consumes up to its delimiter; when the delimiter has not arrived
//! yet the fragment is appended to the state's accumulator, the stream is
//! realigned and `Ok(None)` is returned. The next call resumes in the same
//! state once more bytes are in the stream.

use std::mem;

use crate::error::ParseError;
use crate::http::headers::HeaderTable;
use crate::http::request::{Request, RequestBuilder};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::stream::ByteStream;

const SP: &[u8] = b" ";
const CRLF: &[u8] = b"\r\n";
const COLON: &[u8] = b":";

/// Outcome of one state's attempt to make progress.
enum Progress {
    /// The state's delimiter was found; move to the next state.
    Next,
    /// The blank line ending the header block was consumed.
    EndOfHeaders,
    /// Need more bytes.
    Blocked,
}

/// Appends bytes up to `delimiter` to `acc` and skips the delimiter.
/// Returns whether the delimiter was found.
fn read_token(stream: &mut ByteStream, acc: &mut Vec<u8>, delimiter: &[u8]) -> bool {
    let (fragment, found) = stream.take_until(delimiter);
    acc.extend_from_slice(fragment);
    if found {
        stream.skip(delimiter.len());
    }
    found
}

fn utf8(bytes: Vec<u8>) -> Result<String, ParseError> {
    String::from_utf8(bytes).map_err(|_| ParseError::InvalidEncoding)
}

/// Header block and body scratch shared by both parsers.
#[derive(Debug, Default)]
struct MessageScratch {
    header_name: Vec<u8>,
    header_value: Vec<u8>,
    headers: HeaderTable,
    body: Vec<u8>,
    content_length: usize,
    content_type: String,
}

impl MessageScratch {
    fn header_name(&mut self, stream: &mut ByteStream) -> Result<Progress, ParseError> {
        if self.header_name.is_empty() {
            let head = stream.peek(CRLF.len());
            if head == CRLF {
                stream.skip(CRLF.len());
                self.finish_headers()?;
                return Ok(Progress::EndOfHeaders);
            } else if head == b"\r" {
                return Ok(Progress::Blocked);
            }
        }

        let (fragment, found) = stream.take_until(COLON);
        if fragment.iter().any(|&b| b == b'\r' || b == b'\n') {
            return Err(ParseError::InvalidHeader);
        }
        self.header_name.extend_from_slice(fragment);
        if !found {
            return Ok(Progress::Blocked);
        }
        stream.skip(COLON.len());
        Ok(Progress::Next)
    }

    fn header_value(&mut self, stream: &mut ByteStream) -> Result<Progress, ParseError> {
        if !read_token(stream, &mut self.header_value, CRLF) {
            return Ok(Progress::Blocked);
        }
        let name = utf8(mem::take(&mut self.header_name))?;
        let value = utf8(mem::take(&mut self.header_value))?;
        self.headers
            .add(name, value.trim_start_matches([' ', '\t', '\r', '\n', '\x0b']));
        Ok(Progress::Next)
    }

    /// Sizes the body from the accumulated headers.
    fn finish_headers(&mut self) -> Result<(), ParseError> {
        self.content_length = match self.headers.get("content-length") {
            Some(header) => header
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength(header.value().to_string()))?,
            None => 0,
        };
        self.content_type = self
            .headers
            .value("content-type")
            .unwrap_or_default()
            .to_string();
        Ok(())
    }

    /// Returns `true` once the whole body is in.
    fn content(&mut self, stream: &mut ByteStream) -> bool {
        let remaining = self.content_length - self.body.len();
        self.body.extend_from_slice(stream.take(remaining));
        self.body.len() == self.content_length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Start,
    Method,
    Resource,
    HttpVersion,
    HeaderName,
    HeaderValue,
    Content,
}

/// Incremental parser for requests read by the server.
#[derive(Debug)]
pub struct RequestParser {
    state: RequestState,
    method: Vec<u8>,
    resource: Vec<u8>,
    http_version: Vec<u8>,
    scratch: MessageScratch,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: RequestState::Start,
            method: Vec::new(),
            resource: Vec::new(),
            http_version: Vec::new(),
            scratch: MessageScratch::default(),
        }
    }

    /// Feeds the unread part of `stream` to the state machine.
    ///
    /// `Ok(None)` means the request is incomplete; call again after more
    /// bytes have been read into the stream.
    pub fn parse(&mut self, stream: &mut ByteStream) -> Result<Option<Request>, ParseError> {
        let result = self.advance(stream);
        match &result {
            Ok(None) => stream.realign(),
            Err(_) => self.state = RequestState::Start,
            Ok(Some(_)) => {}
        }
        result
    }

    fn advance(&mut self, stream: &mut ByteStream) -> Result<Option<Request>, ParseError> {
        loop {
            match self.state {
                RequestState::Start => {
                    self.method.clear();
                    self.resource.clear();
                    self.http_version.clear();
                    self.scratch = MessageScratch::default();
                    self.state = RequestState::Method;
                }
                RequestState::Method => {
                    if !read_token(stream, &mut self.method, SP) {
                        return Ok(None);
                    }
                    self.state = RequestState::Resource;
                }
                RequestState::Resource => {
                    if !read_token(stream, &mut self.resource, SP) {
                        return Ok(None);
                    }
                    self.state = RequestState::HttpVersion;
                }
                RequestState::HttpVersion => {
                    if !read_token(stream, &mut self.http_version, CRLF) {
                        return Ok(None);
                    }
                    self.state = RequestState::HeaderName;
                }
                RequestState::HeaderName => match self.scratch.header_name(stream)? {
                    Progress::Next => self.state = RequestState::HeaderValue,
                    Progress::EndOfHeaders => self.state = RequestState::Content,
                    Progress::Blocked => return Ok(None),
                },
                RequestState::HeaderValue => match self.scratch.header_value(stream)? {
                    Progress::Blocked => return Ok(None),
                    _ => self.state = RequestState::HeaderName,
                },
                RequestState::Content => {
                    if !self.scratch.content(stream) {
                        return Ok(None);
                    }
                    self.state = RequestState::Start;
                    return self.finish().map(Some);
                }
            }
        }
    }

    fn finish(&mut self) -> Result<Request, ParseError> {
        let method = utf8(mem::take(&mut self.method))?;
        let resource = utf8(mem::take(&mut self.resource))?;
        let scratch = mem::take(&mut self.scratch);

        Ok(RequestBuilder::from_target(method, &resource)?
            .headers(scratch.headers)
            .body(scratch.body, scratch.content_type)
            .build())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseState {
    Start,
    HttpVersion,
    StatusCode,
    Reason,
    HeaderName,
    HeaderValue,
    Content,
}

/// Incremental parser for responses read by the client.
#[derive(Debug)]
pub struct ResponseParser {
    state: ResponseState,
    http_version: Vec<u8>,
    status_code: Vec<u8>,
    reason: Vec<u8>,
    scratch: MessageScratch,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ResponseState::Start,
            http_version: Vec::new(),
            status_code: Vec::new(),
            reason: Vec::new(),
            scratch: MessageScratch::default(),
        }
    }

    /// Same contract as [`RequestParser::parse`].
    pub fn parse(&mut self, stream: &mut ByteStream) -> Result<Option<Response>, ParseError> {
        let result = self.advance(stream);
        match &result {
            Ok(None) => stream.realign(),
            Err(_) => self.state = ResponseState::Start,
            Ok(Some(_)) => {}
        }
        result
    }

    fn advance(&mut self, stream: &mut ByteStream) -> Result<Option<Response>, ParseError> {
        loop {
            match self.state {
                ResponseState::Start => {
                    self.http_version.clear();
                    self.status_code.clear();
                    self.reason.clear();
                    self.scratch = MessageScratch::default();
                    self.state = ResponseState::HttpVersion;
                }
                ResponseState::HttpVersion => {
                    if !read_token(stream, &mut self.http_version, SP) {
                        return Ok(None);
                    }
                    self.state = ResponseState::StatusCode;
                }
                ResponseState::StatusCode => {
                    if !read_token(stream, &mut self.status_code, SP) {
                        return Ok(None);
                    }
                    self.state = ResponseState::Reason;
                }
                ResponseState::Reason => {
                    if !read_token(stream, &mut self.reason, CRLF) {
                        return Ok(None);
                    }
                    self.state = ResponseState::HeaderName;
                }
                ResponseState::HeaderName => match self.scratch.header_name(stream)? {
                    Progress::Next => self.state = ResponseState::HeaderValue,
                    Progress::EndOfHeaders => self.state = ResponseState::Content,
                    Progress::Blocked => return Ok(None),
                },
                ResponseState::HeaderValue => match self.scratch.header_value(stream)? {
                    Progress::Blocked => return Ok(None),
                    _ => self.state = ResponseState::HeaderName,
                },
                ResponseState::Content => {
                    if !self.scratch.content(stream) {
                        return Ok(None);
                    }
                    self.state = ResponseState::Start;
                    return self.finish().map(Some);
                }
            }
        }
    }

    fn finish(&mut self) -> Result<Response, ParseError> {
        let code = utf8(mem::take(&mut self.status_code))?;
        let status = code
            .trim()
            .parse::<u16>()
            .map_err(|_| ParseError::InvalidStatusCode(code.clone()))?;
        let reason = utf8(mem::take(&mut self.reason))?;
        let scratch = mem::take(&mut self.scratch);

        Ok(ResponseBuilder::new(StatusCode(status))
            .reason(reason)
            .headers(scratch.headers)
            .body(scratch.body, scratch.content_type)
            .build())
    }
}
