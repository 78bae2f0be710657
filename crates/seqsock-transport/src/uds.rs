//! Unix-domain endpoint layer.
//!
//! Opens, binds/listens, connects and accepts stream sockets addressed by
//! filesystem path. Address construction is length-checked: a path that does
//! not fit `sockaddr_un.sun_path` fails with
//! [`TransportError::PathTooLong`] instead of being truncated.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::events::Events;
use crate::stream::{close_fd, poll_ready, Direction, Stream, WaitStatus};

/// Maximum pending connection requests queued by the OS for a listener.
/// Fixed for the lifetime of a listener.
pub const SOCKET_BACKLOG: libc::c_int = 100;

/// Build a `sockaddr_un` for `path`, rejecting paths that do not fit.
fn socket_addr(path: &Path) -> Result<(libc::sockaddr_un, libc::socklen_t)> {
    // SAFETY: sockaddr_un is plain old data; all-zeroes is a valid value.
    let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    let capacity = addr.sun_path.len();

    let bytes = path.as_os_str().as_bytes();
    if bytes.is_empty() {
        return Err(TransportError::EmptyPath);
    }
    // Leave room for the trailing NUL.
    if bytes.len() >= capacity {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len: bytes.len(),
            max: capacity - 1,
        });
    }

    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
    for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }

    let len = (std::mem::size_of::<libc::sa_family_t>() + bytes.len() + 1) as libc::socklen_t;
    Ok((addr, len))
}

/// Create a new connection-oriented local socket.
fn open_socket(events: &Events, origin: &'static str) -> Result<OwnedFd> {
    // SAFETY: plain syscall; the returned fd is immediately claimed by an
    // OwnedFd so every failure path below releases it.
    let fd = unsafe { libc::socket(libc::AF_UNIX, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        let err = io::Error::last_os_error();
        events.os_error(origin, "socket", &err, "socket creation failed");
        return Err(TransportError::Open(err));
    }
    events.notice(origin, "socket_opened", format!("fd={fd}"));
    // SAFETY: `fd` is a freshly created descriptor with no other owner.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Remove a stale socket inode at `path`.
///
/// An absent path is a silent no-op; existence is checked first so a first
/// run does not report a spurious removal failure.
pub fn unlink_stale(path: impl AsRef<Path>, events: &Events) -> Result<()> {
    let path = path.as_ref();
    match std::fs::symlink_metadata(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            events.os_error("unlink_stale", "stat", &err, path.display().to_string());
            Err(TransportError::Unlink {
                path: path.to_path_buf(),
                source: err,
            })
        }
        Ok(_) => match std::fs::remove_file(path) {
            Ok(()) => {
                events.notice("unlink_stale", "inode_unlinked", path.display().to_string());
                Ok(())
            }
            Err(err) => {
                events.os_error("unlink_stale", "unlink", &err, path.display().to_string());
                Err(TransportError::Unlink {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        },
    }
}

/// Connect to a listening socket at `path` with a default diagnostics
/// context.
pub fn connect(path: impl AsRef<Path>) -> Result<Stream> {
    connect_with_events(path, Events::default())
}

/// Connect to a listening socket at `path`.
///
/// On failure the opened socket is closed before the error is returned.
pub fn connect_with_events(path: impl AsRef<Path>, events: Events) -> Result<Stream> {
    let path = path.as_ref();
    // Validated up front so an over-long path fails distinctly rather than
    // connecting to a truncated address.
    let (addr, addrlen) = socket_addr(path)?;

    let fd = open_socket(&events, "connect")?;
    // SAFETY: `addr` is a valid sockaddr_un of the advertised length and
    // `fd` is an open socket owned by this function.
    let rc = unsafe {
        libc::connect(
            fd.as_raw_fd(),
            (&addr as *const libc::sockaddr_un).cast::<libc::sockaddr>(),
            addrlen,
        )
    };
    if rc != 0 {
        let err = io::Error::last_os_error();
        events.os_error("connect", "connect", &err, path.display().to_string());
        return Err(TransportError::Connect {
            path: path.to_path_buf(),
            source: err,
        });
    }
    events.notice(
        "connect",
        "socket_connected",
        format!("path={} fd={}", path.display(), fd.as_raw_fd()),
    );
    Ok(Stream::new(UnixStream::from(fd), events))
}

/// A listening Unix-domain endpoint.
///
/// The socket inode is NOT removed on drop: a stopped or crashed server
/// leaves it behind, and the next [`Listener::bind`] at the same path
/// unlinks it before binding fresh.
pub struct Listener {
    inner: UnixListener,
    path: PathBuf,
    events: Events,
}

impl Listener {
    /// Bind and listen at `path` with a default diagnostics context.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_events(path, Events::default())
    }

    /// Bind and listen at `path`.
    ///
    /// Opens a socket, removes any stale inode at `path`, binds, and listens
    /// with the fixed [`SOCKET_BACKLOG`]. Every failure path closes the
    /// opened socket before returning.
    pub fn bind_with_events(path: impl AsRef<Path>, events: Events) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (addr, addrlen) = socket_addr(&path)?;

        let fd = open_socket(&events, "bind")?;
        unlink_stale(&path, &events)?;

        // SAFETY: `addr` is a valid sockaddr_un of the advertised length and
        // `fd` is an open socket owned by this function.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                (&addr as *const libc::sockaddr_un).cast::<libc::sockaddr>(),
                addrlen,
            )
        };
        if rc != 0 {
            let err = io::Error::last_os_error();
            events.os_error("bind", "bind", &err, path.display().to_string());
            return Err(TransportError::Bind { path, source: err });
        }
        events.notice(
            "bind",
            "socket_bound",
            format!("path={} fd={}", path.display(), fd.as_raw_fd()),
        );

        // SAFETY: `fd` is a bound socket owned by this function.
        let rc = unsafe { libc::listen(fd.as_raw_fd(), SOCKET_BACKLOG) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            events.os_error("bind", "listen", &err, path.display().to_string());
            return Err(TransportError::Bind { path, source: err });
        }
        events.notice(
            "bind",
            "socket_listening",
            format!("path={} fd={}", path.display(), fd.as_raw_fd()),
        );
        tracing::info!(path = %path.display(), "listening on unix domain socket");

        Ok(Self {
            inner: UnixListener::from(fd),
            path,
            events,
        })
    }

    /// Block until a new connection arrives and return it.
    pub fn accept(&self) -> Result<Stream> {
        match self.inner.accept() {
            Ok((stream, _addr)) => {
                self.events.notice(
                    "accept",
                    "socket_connected",
                    format!(
                        "lis_fd={} fd={}",
                        self.inner.as_raw_fd(),
                        stream.as_raw_fd()
                    ),
                );
                Ok(Stream::new(stream, self.events.clone()))
            }
            Err(err) => {
                self.events.os_error(
                    "accept",
                    "accept",
                    &err,
                    format!("lis_fd={}", self.inner.as_raw_fd()),
                );
                Err(TransportError::Accept(err))
            }
        }
    }

    /// Bounded readiness wait on the listening descriptor.
    ///
    /// `None` waits indefinitely. A pending connection makes the descriptor
    /// readable.
    pub fn wait_incoming(&self, max_wait: Option<Duration>) -> Result<WaitStatus> {
        poll_ready(
            self.inner.as_raw_fd(),
            max_wait,
            Direction::Readable,
            &self.events,
            "wait_incoming",
        )
    }

    /// Release the listening socket, reporting the outcome.
    ///
    /// The socket inode stays in place; the next bind at this path removes
    /// it.
    pub fn close(self) {
        let Listener { inner, events, .. } = self;
        close_fd(inner.into_raw_fd(), &events, "close");
    }

    /// The path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The diagnostics context attached to this listener.
    pub fn events(&self) -> &Events {
        &self.events
    }
}

impl AsRawFd for Listener {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.inner.as_raw_fd()
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("path", &self.path)
            .field("fd", &self.inner.as_raw_fd())
            .finish()
    }
}
