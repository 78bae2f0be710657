//! Sequential IPC over Unix-domain stream sockets.
//!
//! seqsock lets one process issue fire-and-forget messages or synchronous
//! request/response calls, and another run a single-threaded server that
//! accepts connections sequentially and drives a per-message handler.
//!
//! # Crate Structure
//!
//! - [`transport`] — Socket primitives: readiness waits, single-shot
//!   reads/writes, error diagnosis, path-addressed endpoints.
//! - [`serve`] — Request patterns and the sequential server state machine.

/// Re-export transport types.
pub mod transport {
    pub use seqsock_transport::*;
}

/// Re-export request patterns and the sequential server.
pub mod serve {
    pub use seqsock_serve::*;
}
