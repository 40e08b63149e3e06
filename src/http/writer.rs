use crate::error::TransportError;
use crate::http::message::HttpMessage;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::net::socket::Socket;

const HTTP_VERSION: &str = "HTTP/1.1";

fn write_headers_and_body(buf: &mut Vec<u8>, message: &impl HttpMessage) {
    for header in message.headers() {
        buf.extend_from_slice(header.name().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(header.value().as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf.extend_from_slice(message.body());
}

pub fn serialize_request(req: &Request) -> Vec<u8> {
    let mut buf = Vec::new();

    let request_line = format!("{} {} {}\r\n", req.method(), req.target(), HTTP_VERSION);
    buf.extend_from_slice(request_line.as_bytes());

    write_headers_and_body(&mut buf, req);
    buf
}

pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    let status_line = format!("{} {} {}\r\n", HTTP_VERSION, resp.status, resp.reason());
    buf.extend_from_slice(status_line.as_bytes());

    write_headers_and_body(&mut buf, resp);
    buf
}

/// A serialized message plus how much of it has gone out so far.
///
/// Non-blocking sockets may accept only a prefix per readiness round; the
/// writer keeps the rest until the socket is writable again.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self::from_bytes(serialize_response(response))
    }

    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.written
    }

    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }

    /// Sends as much as the socket takes right now.
    ///
    /// Returns `true` when the whole buffer has been sent.
    pub fn write_to_socket(&mut self, socket: &Socket) -> Result<bool, TransportError> {
        if !self.is_done() {
            self.written += socket.write(&self.buffer[self.written..])?;
        }
        Ok(self.is_done())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_carries_encoded_query() {
        let req = Request::builder("GET", "/fans").arg("curve", "a b").build();
        let wire = String::from_utf8(serialize_request(&req)).unwrap();
        assert!(wire.starts_with("GET /fans?curve=a%20b HTTP/1.1\r\n"));
    }
}
