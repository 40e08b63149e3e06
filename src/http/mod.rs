//! HTTP/1.1 message layer.
//!
//! This module implements the subset of HTTP/1.1 spoken over the local
//! socket: one request and one response per connection, bodies framed by
//! `Content-Length` only.
//!
//! # Architecture
//!
//! - **`stream`**: `ByteStream`, the cursor-based buffer every socket reads into
//! - **`headers`**: `KeyValue` and the case-insensitive, first-wins `HeaderTable`
//! - **`query`**: `ArgTable` and the percent-encoding codec for query strings
//! - **`message`**: the body/content-type/headers part shared by requests and responses
//! - **`request`** / **`response`**: message values and their builders
//! - **`parser`**: resumable request and response state machines
//! - **`writer`**: wire serialization and partial-write bookkeeping
//! - **`connection`**: the server-side per-connection state machine
//!
//! # Connection State Machine
//!
//! Each accepted connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Feed readable bytes to the request parser
//!        └──────┬──────┘
//!               │ Request parsed and dispatched
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Flush the response, resuming on POLLOUT
//!        └──────┬───────────┘
//!               │ Response sent (always Connection: close)
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Purged at the end of the loop iteration
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod headers;
pub mod message;
pub mod parser;
pub mod query;
pub mod request;
pub mod response;
pub mod stream;
pub mod writer;

pub use headers::{HeaderTable, KeyValue};
pub use message::HttpMessage;
pub use query::ArgTable;
