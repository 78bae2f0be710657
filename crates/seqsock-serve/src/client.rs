//! Caller-facing request patterns.
//!
//! Both patterns open their own connection, use it for exactly one exchange,
//! and close it before returning. Payloads are raw bytes; a single send and a
//! single receive bound the exchange, so callers needing framing or multi-read
//! responses build above this layer.

use std::path::Path;

use seqsock_transport::{connect_with_events, Events};

use crate::error::Result;

/// Connect to `path`, send `msg` once, and close the connection regardless of
/// the send outcome. Returns the number of bytes sent.
pub fn send_oneshot(path: impl AsRef<Path>, msg: &[u8]) -> Result<usize> {
    send_oneshot_with_events(path, msg, Events::default())
}

/// [`send_oneshot`] with an explicit diagnostics context.
pub fn send_oneshot_with_events(
    path: impl AsRef<Path>,
    msg: &[u8],
    events: Events,
) -> Result<usize> {
    let mut stream = connect_with_events(path, events)?;
    let result = stream.send(msg);
    stream.close();
    Ok(result?)
}

/// Connect to `path`, send `msg`, and read a single response into `buf`.
///
/// If the send fails the connection is closed and the error returned without
/// attempting a read. Otherwise the result of one receive is returned: bytes
/// read, or `0` when the server shut the connection down without replying.
/// One shot — no retry, no reconnect, at most one server connection per call.
pub fn request_response(path: impl AsRef<Path>, msg: &[u8], buf: &mut [u8]) -> Result<usize> {
    request_response_with_events(path, msg, buf, Events::default())
}

/// [`request_response`] with an explicit diagnostics context.
pub fn request_response_with_events(
    path: impl AsRef<Path>,
    msg: &[u8],
    buf: &mut [u8],
    events: Events,
) -> Result<usize> {
    let mut stream = connect_with_events(path, events)?;
    if let Err(err) = stream.send(msg) {
        stream.close();
        return Err(err.into());
    }
    let result = stream.recv(buf);
    stream.close();
    Ok(result?)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::thread;

    use seqsock_transport::{Listener, TransportError};

    use super::*;
    use crate::error::ServeError;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/seqsock-client-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("client.sock")
    }

    fn cleanup(sock_path: &std::path::Path) {
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn oneshot_delivers_payload() {
        let sock_path = make_sock_path("oneshot");
        let listener = Listener::bind(&sock_path).expect("listener should bind");

        let server = thread::spawn(move || {
            let mut conn = listener.accept().expect("accept should succeed");
            let mut buf = [0u8; 64];
            let len = conn.recv(&mut buf).expect("recv should succeed");
            buf[..len].to_vec()
        });

        let sent = send_oneshot(&sock_path, b"fire-and-forget").expect("oneshot should succeed");
        assert_eq!(sent, b"fire-and-forget".len());
        assert_eq!(server.join().expect("server should finish"), b"fire-and-forget");
        cleanup(&sock_path);
    }

    #[test]
    fn oneshot_fails_when_nobody_listens() {
        let sock_path = make_sock_path("refused");
        let result = send_oneshot(&sock_path, b"nobody home");
        assert!(matches!(
            result,
            Err(ServeError::Transport(TransportError::Connect { .. }))
        ));
        cleanup(&sock_path);
    }

    #[test]
    fn request_response_round_trip() {
        let sock_path = make_sock_path("rpc");
        let listener = Listener::bind(&sock_path).expect("listener should bind");

        let server = thread::spawn(move || {
            let mut conn = listener.accept().expect("accept should succeed");
            let mut buf = [0u8; 64];
            let len = conn.recv(&mut buf).expect("recv should succeed");
            conn.send(&buf[..len]).expect("echo should succeed");
        });

        let mut response = [0u8; 64];
        let len =
            request_response(&sock_path, b"marco", &mut response).expect("rpc should succeed");
        assert_eq!(&response[..len], b"marco");

        server.join().expect("server should finish");
        cleanup(&sock_path);
    }

    #[test]
    fn request_response_sees_silent_close_as_zero() {
        let sock_path = make_sock_path("silent");
        let listener = Listener::bind(&sock_path).expect("listener should bind");

        let server = thread::spawn(move || {
            let mut conn = listener.accept().expect("accept should succeed");
            let mut buf = [0u8; 64];
            let _ = conn.recv(&mut buf).expect("recv should succeed");
            conn.close();
        });

        let mut response = [0u8; 64];
        let len = request_response(&sock_path, b"anyone?", &mut response)
            .expect("rpc should complete");
        assert_eq!(len, 0);

        server.join().expect("server should finish");
        cleanup(&sock_path);
    }
}
