//! Request patterns and the sequential server.
//!
//! This is the caller-facing layer. Clients issue fire-and-forget sends or
//! synchronous request/response calls; servers accept one connection at a
//! time and drive a per-message handler.

pub mod client;
pub mod error;
pub mod server;

pub use client::{
    request_response, request_response_with_events, send_oneshot, send_oneshot_with_events,
};
pub use error::{Result, ServeError};
pub use server::{Control, Server, RECV_BUFFER_SIZE};
