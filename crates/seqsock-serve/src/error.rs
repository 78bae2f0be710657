use seqsock_transport::TransportError;

/// Errors that can occur while serving or issuing requests.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Transport-level error (connect, bind, send, receive).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A read on the service connection failed, ending the server with an
    /// error outcome.
    #[error("connection read failed: {0}")]
    ConnectionRead(#[source] TransportError),
}

pub type Result<T> = std::result::Result<T, ServeError>;
