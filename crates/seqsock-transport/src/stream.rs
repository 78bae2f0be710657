//! Byte-stream primitives over a connected Unix-domain socket.
//!
//! A [`Stream`] performs single-shot reads and writes (no loops to fill a
//! buffer or drain a payload), bounded readiness waits, and asynchronous
//! error diagnosis. Partial writes are returned as-is; callers needing
//! guaranteed full delivery loop above this layer.

use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::events::Events;
use crate::retry::retry_interrupted;

/// Which readiness condition to wait for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Readable,
    Writable,
}

/// Outcome of a bounded readiness wait.
///
/// Error conditions on the descriptor are diagnosed and surfaced as `Err`,
/// so a successful wait is two-valued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    /// The bound elapsed with no activity.
    TimedOut,
    /// The requested direction is ready.
    Ready,
}

/// A connected stream endpoint with an attached diagnostics context.
pub struct Stream {
    inner: UnixStream,
    events: Events,
}

impl Stream {
    pub(crate) fn new(inner: UnixStream, events: Events) -> Self {
        Self { inner, events }
    }

    /// Wait until the socket is ready for `direction`, the bound elapses, or
    /// an error occurs. `None` waits indefinitely; an indefinite wait never
    /// reports [`WaitStatus::TimedOut`].
    ///
    /// Signal interruptions are retried internally and never surfaced. If the
    /// poll reports an error condition on the descriptor, the socket is
    /// diagnosed to recover the concrete failure reason.
    pub fn wait(&self, max_wait: Option<Duration>, direction: Direction) -> Result<WaitStatus> {
        poll_ready(self.inner.as_raw_fd(), max_wait, direction, &self.events, "wait")
    }

    /// Wait for the socket to become readable.
    pub fn wait_readable(&self, max_wait: Option<Duration>) -> Result<WaitStatus> {
        self.wait(max_wait, Direction::Readable)
    }

    /// Wait for the socket to become writable.
    pub fn wait_writable(&self, max_wait: Option<Duration>) -> Result<WaitStatus> {
        self.wait(max_wait, Direction::Writable)
    }

    /// Retrieve the socket's pending asynchronous error status.
    ///
    /// Returns `Ok(())` when no error is pending; otherwise the pending error
    /// is reported and returned as [`TransportError::SocketError`].
    pub fn diagnose(&self) -> Result<()> {
        diagnose_fd(self.inner.as_raw_fd(), &self.events, "diagnose")
    }

    /// Perform a single read of up to `buf.len()` bytes.
    ///
    /// Returns the number of bytes read; `Ok(0)` means the peer performed an
    /// orderly shutdown. A single underlying read's worth of data is
    /// returned, which may be less than requested.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let fd = self.inner.as_raw_fd();
        match retry_interrupted(|| self.inner.read(buf)) {
            Ok(count) => {
                tracing::trace!(fd, count, "recv");
                Ok(count)
            }
            Err(err) => {
                self.events.os_error("recv", "read", &err, format!("fd={fd}"));
                Err(err.into())
            }
        }
    }

    /// Perform a single write of `msg`.
    ///
    /// An empty payload is rejected without attempting I/O. Partial writes
    /// are possible and returned as-is.
    pub fn send(&mut self, msg: &[u8]) -> Result<usize> {
        if msg.is_empty() {
            self.events
                .error("send", "empty_payload", "refusing zero-length write");
            return Err(TransportError::EmptyPayload);
        }
        let fd = self.inner.as_raw_fd();
        match retry_interrupted(|| self.inner.write(msg)) {
            Ok(count) => {
                tracing::trace!(fd, count, "send");
                Ok(count)
            }
            Err(err) => {
                self.events.os_error("send", "write", &err, format!("fd={fd}"));
                Err(err.into())
            }
        }
    }

    /// Release the OS resource, reporting the outcome.
    ///
    /// A stream that is dropped without an explicit `close` is still released
    /// by RAII, silently. Consuming `self` makes reuse after close impossible.
    pub fn close(self) {
        let Stream { inner, events } = self;
        close_fd(inner.into_raw_fd(), &events, "close");
    }

    /// The diagnostics context attached to this stream.
    pub fn events(&self) -> &Events {
        &self.events
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl AsRawFd for Stream {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}

/// Read the pending error slot (`SO_ERROR`) without reporting anything.
fn pending_socket_error(fd: RawFd) -> io::Result<Option<io::Error>> {
    let mut optval: libc::c_int = 0;
    let mut optlen = std::mem::size_of::<libc::c_int>() as libc::socklen_t;

    // SAFETY: `optval` and `optlen` are valid writable pointers for the
    // advertised size, and `fd` is an open socket descriptor owned by the
    // caller.
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            (&mut optval as *mut libc::c_int).cast::<libc::c_void>(),
            &mut optlen,
        )
    };

    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    if optval == 0 {
        Ok(None)
    } else {
        Ok(Some(io::Error::from_raw_os_error(optval)))
    }
}

pub(crate) fn diagnose_fd(fd: RawFd, events: &Events, origin: &'static str) -> Result<()> {
    match pending_socket_error(fd) {
        Err(err) => {
            events.os_error(origin, "getsockopt", &err, format!("fd={fd}"));
            Err(err.into())
        }
        Ok(None) => Ok(()),
        Ok(Some(err)) => {
            events.os_error(origin, "so_error", &err, format!("fd={fd}"));
            Err(TransportError::SocketError(err))
        }
    }
}

pub(crate) fn poll_ready(
    fd: RawFd,
    max_wait: Option<Duration>,
    direction: Direction,
    events: &Events,
    origin: &'static str,
) -> Result<WaitStatus> {
    let interest = match direction {
        Direction::Readable => libc::POLLIN,
        Direction::Writable => libc::POLLOUT,
    };
    let mut fdset = libc::pollfd {
        fd,
        events: interest,
        revents: 0,
    };
    let timeout = match max_wait {
        None => -1,
        Some(bound) => libc::c_int::try_from(bound.as_millis()).unwrap_or(libc::c_int::MAX),
    };

    let count = retry_interrupted(|| {
        // SAFETY: `fdset` is a valid pollfd array of length 1 for the
        // duration of the call.
        let rc = unsafe { libc::poll(&mut fdset, 1, timeout) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(rc)
        }
    });

    match count {
        Err(err) => {
            events.os_error(origin, "poll", &err, format!("fd={fd}"));
            Err(err.into())
        }
        Ok(0) => Ok(WaitStatus::TimedOut),
        Ok(_) => {
            if fdset.revents & libc::POLLERR != 0 {
                // Recover the concrete failure reason before reporting.
                diagnose_fd(fd, events, origin)?;
                let err = io::Error::other("poll reported an error condition");
                events.os_error(origin, "poll", &err, format!("fd={fd}"));
                Err(TransportError::SocketError(err))
            } else {
                Ok(WaitStatus::Ready)
            }
        }
    }
}

pub(crate) fn close_fd(fd: RawFd, events: &Events, origin: &'static str) {
    // SAFETY: the fd was released from its RAII owner immediately before this
    // call and is closed exactly once.
    let rc = unsafe { libc::close(fd) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        events.os_error(origin, "close", &err, format!("fd={fd}"));
    } else {
        events.notice(origin, "socket_closed", format!("fd={fd}"));
    }
}
