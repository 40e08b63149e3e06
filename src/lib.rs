//! coolipc - HTTP/1.1 over Unix domain sockets
//!
//! Core library for the cooling daemon's local IPC: message model,
//! resumable parsers, non-blocking sockets, the routing server and the
//! blocking client.

pub mod client;
pub mod config;
pub mod daemon;
pub mod device;
pub mod error;
pub mod http;
pub mod net;
pub mod server;

pub use client::Client;
pub use error::{ClientError, ParseError, ServerError, TransportError};
pub use http::request::{Request, RequestBuilder};
pub use http::response::{Response, ResponseBuilder};
pub use server::listener::{Server, ServerHandle, ShutdownHandle};

/// Name advertised in the `X-Framework` header and the default `Host`.
pub const FRAMEWORK_NAME: &str = "coolipc";

/// Crate version, appended to [`FRAMEWORK_NAME`] on the wire.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `"coolipc <version>"`, as sent in `X-Framework`.
pub fn framework_id() -> String {
    format!("{FRAMEWORK_NAME} {VERSION}")
}
