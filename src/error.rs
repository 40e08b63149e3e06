//! Fault taxonomy shared by the socket layer, parsers, client and server.

use std::io;

/// A socket syscall failed with something other than would-block.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("unable to {op} the local socket: {source}")]
    Socket {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("socket path is too long for sockaddr_un: {0}")]
    PathTooLong(String),

    #[error("readiness poll failed: {0}")]
    Poll(#[source] io::Error),
}

impl TransportError {
    pub(crate) fn socket(op: &'static str, source: io::Error) -> Self {
        TransportError::Socket { op, source }
    }
}

/// The byte stream does not describe a valid HTTP message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid Content-Length header value: {0:?}")]
    InvalidContentLength(String),

    #[error("invalid status code: {0:?}")]
    InvalidStatusCode(String),

    #[error("header line without a name/value separator")]
    InvalidHeader,

    #[error("message head or query argument is not valid UTF-8")]
    InvalidEncoding,
}

/// Errors from [`Client`](crate::Client) round trips.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server closed connection before sending a full response")]
    PeerClosed,

    #[error("malformed response: {0}")]
    Parse(#[from] ParseError),

    #[error("unable to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    /// Transport faults are the only ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Errors that stop the server or prevent it from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("unable to prepare socket path {path}: {source}")]
    SocketPath {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("unable to spawn server worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("server worker panicked")]
    WorkerPanicked,
}
