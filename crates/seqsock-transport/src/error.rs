use std::path::PathBuf;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create a socket.
    #[error("failed to open socket: {0}")]
    Open(std::io::Error),

    /// Failed to bind to the specified path.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified path.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Failed to remove a stale socket inode.
    #[error("failed to unlink stale socket at {path}: {source}")]
    Unlink {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An asynchronous error was pending on the socket (`SO_ERROR`).
    #[error("pending socket error: {0}")]
    SocketError(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// An empty path cannot address a socket.
    #[error("socket path is empty")]
    EmptyPath,

    /// A zero-length payload was passed to `send`.
    #[error("refusing to send an empty payload")]
    EmptyPayload,
}

impl TransportError {
    /// The underlying OS error code, when one exists.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            TransportError::Open(source)
            | TransportError::Accept(source)
            | TransportError::SocketError(source)
            | TransportError::Io(source)
            | TransportError::Bind { source, .. }
            | TransportError::Connect { source, .. }
            | TransportError::Unlink { source, .. } => source.raw_os_error(),
            TransportError::PathTooLong { .. }
            | TransportError::EmptyPath
            | TransportError::EmptyPayload => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
