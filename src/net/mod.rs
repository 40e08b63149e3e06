//! Raw Unix-socket plumbing: the non-blocking [`Socket`](socket::Socket),
//! the readiness poll and the server's control channel.

pub mod control;
pub mod poll;
pub mod socket;
