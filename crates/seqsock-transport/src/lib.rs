//! Unix-domain stream socket primitives for sequential IPC.
//!
//! This is the lowest layer of seqsock. It provides:
//!
//! - [`stream`] — interruption-safe single-shot reads and writes, bounded
//!   readiness waits, asynchronous error diagnosis, and explicit close over
//!   a connected socket.
//! - [`uds`] — endpoints addressed by filesystem path: connect, bind/listen
//!   with stale-inode removal, and accept.
//! - [`events`] — the injectable diagnostics context everything above
//!   reports through.
//!
//! The transport moves raw byte buffers; message framing is the caller's
//! concern.

#![cfg(unix)]

pub mod error;
pub mod events;
pub mod retry;
pub mod stream;
pub mod uds;

pub use error::{Result, TransportError};
pub use events::{CaptureSink, Event, EventSink, Events, Severity, TracingSink};
pub use retry::retry_interrupted;
pub use stream::{Direction, Stream, WaitStatus};
pub use uds::{connect, connect_with_events, unlink_stale, Listener, SOCKET_BACKLOG};
