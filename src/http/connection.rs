use tracing::{debug, warn};

use crate::http::parser::RequestParser;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::net::poll::Interest;
use crate::net::socket::Socket;

/// One accepted client socket and its request parser.
#[derive(Debug)]
pub struct Connection {
    socket: Socket,
    parser: RequestParser,
    state: ConnectionState,
}

#[derive(Debug)]
pub enum ConnectionState {
    Reading,
    Writing(ResponseWriter),
    Closed,
}

/// What a readable connection produced.
#[derive(Debug)]
pub enum ReadEvent {
    /// Not a full request yet.
    Pending,
    Request(Request),
    /// Reading or parsing failed; this response should go back instead.
    Fault(Response),
}

impl Connection {
    pub fn new(socket: Socket) -> Self {
        Self {
            socket,
            parser: RequestParser::new(),
            state: ConnectionState::Reading,
        }
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_reading(&self) -> bool {
        matches!(self.state, ConnectionState::Reading)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ConnectionState::Closed) || self.socket.is_closed()
    }

    /// Poll interest for the current state.
    pub fn interest(&self) -> Interest {
        match self.state {
            ConnectionState::Writing(_) => Interest::Writable,
            _ => Interest::Readable,
        }
    }

    /// Reads what the socket has and feeds it to the parser.
    pub fn read_request(&mut self) -> ReadEvent {
        loop {
            let read = match self.socket.read() {
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, "failed to read from connection");
                    return ReadEvent::Fault(Response::internal_error(e.to_string()));
                }
            };

            match self.parser.parse(self.socket.stream_mut()) {
                Ok(Some(request)) => return ReadEvent::Request(request),
                Ok(None) => {}
                Err(e) => {
                    debug!(error = %e, "rejecting malformed request");
                    return ReadEvent::Fault(Response::bad_request(e.to_string()));
                }
            }

            if read == 0 {
                break;
            }
        }

        if self.socket.peer_closed() {
            debug!("peer closed connection before sending a full request");
            self.close();
        }
        ReadEvent::Pending
    }

    /// Queues `response` and sends as much of it as possible right away.
    pub fn respond(&mut self, response: &Response) {
        self.state = ConnectionState::Writing(ResponseWriter::new(response));
        self.flush();
    }

    /// Continues a pending write; closes the connection once it is done.
    pub fn flush(&mut self) {
        let ConnectionState::Writing(writer) = &mut self.state else {
            return;
        };

        match writer.write_to_socket(&self.socket) {
            Ok(true) => self.close(),
            Ok(false) => {
                debug!(remaining = writer.remaining(), "response partially written, waiting for POLLOUT");
            }
            Err(e) => {
                warn!(error = %e, "failed to write response");
                self.close();
            }
        }
    }

    pub fn close(&mut self) {
        self.socket.close();
        self.state = ConnectionState::Closed;
    }
}
