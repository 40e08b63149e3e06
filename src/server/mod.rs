//! Routing server: the route table and the poll-driven listener.

pub mod listener;
pub mod router;
