//! The sequential server.
//!
//! One listening socket, one client connection at a time. The server accepts
//! a connection, dispatches each received message to the caller-supplied
//! handler, and interprets the handler's [`Control`] to decide whether to
//! keep serving the connection, move to the next one, or shut down. Newly
//! arriving connection attempts queue in the OS backlog while a connection is
//! being served.

use std::path::{Path, PathBuf};
use std::time::Duration;

use seqsock_transport::{Events, Listener, Stream, TransportError, WaitStatus};

use crate::error::{Result, ServeError};

/// Size of the per-message receive buffer.
pub const RECV_BUFFER_SIZE: usize = 8192;

/// Handler verdict after processing one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Keep serving the current connection.
    Continue,
    /// Close the current connection and accept the next one.
    CloseConnection,
    /// Close the current connection and stop the server cleanly.
    Shutdown,
}

/// Why the inner per-connection loop stopped.
///
/// `IoError` is internal vocabulary, distinct from the handler's: it has the
/// same control effect as [`Control::Shutdown`] but marks the server outcome
/// as an error rather than a clean stop.
enum Stop {
    CloseConnection,
    Shutdown,
    IoError(TransportError),
}

/// A single-threaded sequential server bound to a filesystem path.
///
/// All I/O is blocking; the only way to stop a running server from the
/// outside is a handler returning [`Control::Shutdown`] or a hard read
/// error on the service connection.
pub struct Server {
    path: PathBuf,
    accept_timeout: Option<Duration>,
    recv_timeout: Option<Duration>,
    events: Events,
}

impl Server {
    /// Configure a server for `path`. Nothing happens until [`Server::run`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            accept_timeout: None,
            recv_timeout: None,
            events: Events::default(),
        }
    }

    /// Bound the readiness wait before each accept.
    ///
    /// The wait outcome is observational only: the accept still blocks until
    /// a connection arrives. It provides an early diagnostic on wait failure,
    /// nothing more.
    pub fn with_accept_timeout(mut self, bound: Duration) -> Self {
        self.accept_timeout = Some(bound);
        self
    }

    /// Bound the readiness wait before each receive on a service connection.
    ///
    /// Unlike the accept wait, this one gates the read: the receive is
    /// attempted only once the connection reports readable.
    pub fn with_recv_timeout(mut self, bound: Duration) -> Self {
        self.recv_timeout = Some(bound);
        self
    }

    /// Install an explicit diagnostics context.
    pub fn with_events(mut self, events: Events) -> Self {
        self.events = events;
        self
    }

    /// Bind, listen, and serve until the handler requests shutdown or a read
    /// fails.
    ///
    /// The handler receives the live connection (so it can reply in-band) and
    /// the received bytes; it must not retain the buffer beyond the call.
    /// Returns `Ok(())` for a clean stop and an error for a failed listen or
    /// a failed read — the sole externally visible result.
    pub fn run<H>(&self, mut handler: H) -> Result<()>
    where
        H: FnMut(&mut Stream, &[u8]) -> Control,
    {
        let listener = Listener::bind_with_events(&self.path, self.events.clone())?;
        let span = tracing::debug_span!("serve", path = %self.path.display());
        let _guard = span.enter();

        let mut outcome = Ok(());
        let mut stopping = false;
        while !stopping {
            if let Some(bound) = self.accept_timeout {
                // Observational only: regardless of the outcome, the accept
                // below blocks until a connection actually arrives.
                if let Err(err) = listener.wait_incoming(Some(bound)) {
                    tracing::warn!(error = %err, "accept wait failed");
                }
            }

            let mut conn = match listener.accept() {
                Ok(conn) => conn,
                Err(err) => {
                    self.events
                        .error("run", "accept_failed", err.to_string());
                    continue;
                }
            };

            let stop = self.serve_connection(&mut conn, &mut handler);
            match stop {
                Stop::CloseConnection => {}
                Stop::Shutdown => {
                    tracing::debug!("shutdown requested by handler");
                    stopping = true;
                }
                Stop::IoError(err) => {
                    self.events
                        .error("run", "connection_read_failed", err.to_string());
                    outcome = Err(ServeError::ConnectionRead(err));
                    stopping = true;
                }
            }
            conn.close();
        }

        listener.close();
        outcome
    }

    /// Inner loop: process messages on one service connection until a stop
    /// signal is produced.
    fn serve_connection<H>(&self, conn: &mut Stream, handler: &mut H) -> Stop
    where
        H: FnMut(&mut Stream, &[u8]) -> Control,
    {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        loop {
            if let Some(bound) = self.recv_timeout {
                match conn.wait_readable(Some(bound)) {
                    Ok(WaitStatus::Ready) => {}
                    Ok(WaitStatus::TimedOut) => continue,
                    Err(err) => return Stop::IoError(err),
                }
            }

            match conn.recv(&mut buf) {
                Ok(0) => {
                    // No bytes read. An orderly peer shutdown is not
                    // distinguished from a quiescent connection here; the
                    // loop keeps waiting.
                }
                Ok(len) => match handler(conn, &buf[..len]) {
                    Control::Continue => {}
                    Control::CloseConnection => return Stop::CloseConnection,
                    Control::Shutdown => return Stop::Shutdown,
                },
                Err(err) => return Stop::IoError(err),
            }
        }
    }

    /// The path this server binds when run.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("path", &self.path)
            .field("accept_timeout", &self.accept_timeout)
            .field("recv_timeout", &self.recv_timeout)
            .finish()
    }
}
