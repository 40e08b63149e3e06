//! Blocking client: one fresh connection per request.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::headers::HeaderTable;
use crate::http::message::HttpMessage;
use crate::http::parser::ResponseParser;
use crate::http::query::ArgTable;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::serialize_request;
use crate::net::poll::{Interest, wait_for};
use crate::net::socket::Socket;

#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
    host: String,
}

impl Client {
    /// A client for the server at `socket_path`, sending the default `Host`.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            host: crate::framework_id(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.socket_path).with_host(config.host.clone())
    }

    /// Value used for the `Host` header when a request has none.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Builds a request from its parts and performs the round trip.
    pub fn send_request(
        &self,
        method: &str,
        resource: &str,
        args: Option<&ArgTable>,
        headers: Option<HeaderTable>,
        body: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<Response, ClientError> {
        let mut builder = Request::builder(method, resource).body(body, content_type);
        if let Some(args) = args {
            builder = builder.args(args);
        }
        if let Some(headers) = headers {
            builder = builder.headers(headers);
        }
        self.send(builder.build())
    }

    /// Sends `request` on a new connection and waits for the full response.
    pub fn send(&self, mut request: Request) -> Result<Response, ClientError> {
        request.add_header("Host", &self.host);
        request.calculate_content_length();
        self.round_trip(&request)
    }

    pub fn get(&self, resource: &str) -> Result<Response, ClientError> {
        self.send(Request::new("GET", resource))
    }

    pub fn post_json<T: Serialize + ?Sized>(
        &self,
        resource: &str,
        value: &T,
    ) -> Result<Response, ClientError> {
        let request = Request::builder("POST", resource).json(value)?.build();
        self.send(request)
    }

    fn round_trip(&self, request: &Request) -> Result<Response, ClientError> {
        let mut socket = Socket::new()?;
        socket.connect(&self.socket_path)?;
        debug!(
            path = %self.socket_path.display(),
            method = request.method(),
            resource = request.resource(),
            "sending request"
        );

        let wire = serialize_request(request);
        let mut sent = 0;
        while sent < wire.len() {
            sent += socket.write(&wire[sent..])?;
            if sent < wire.len() {
                let readiness = wait_for(&socket, Interest::Writable)?;
                if readiness.is_hung_up() || readiness.is_error() {
                    return Err(ClientError::PeerClosed);
                }
            }
        }

        let mut parser = ResponseParser::new();
        loop {
            let readiness = wait_for(&socket, Interest::Readable)?;

            // Drain before honouring a hang-up: the response may precede it.
            loop {
                let read = socket.read()?;
                if let Some(response) = parser.parse(socket.stream_mut())? {
                    debug!(status = response.status.as_u16(), "response received");
                    return Ok(response);
                }
                if read == 0 {
                    break;
                }
            }

            if socket.peer_closed() || readiness.is_hung_up() || readiness.is_error() {
                return Err(ClientError::PeerClosed);
            }
        }
    }
}
