//! End-to-end behavior of the sequential server.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use seqsock_serve::{request_response, send_oneshot, Control, ServeError, Server};
use seqsock_transport::{connect, CaptureSink, Events, Listener, TransportError};

const CONNECT_RETRY_TIMEOUT: Duration = Duration::from_secs(5);

fn make_sock_path(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/seqsock-srv-{}-{}-{}",
        tag,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir.join("server.sock")
}

fn cleanup(sock_path: &Path) {
    if let Some(parent) = sock_path.parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}

/// Retry a request until the server is listening. Only connect failures are
/// retried; once a connection was established the result stands.
fn rpc_with_retry(path: &Path, msg: &[u8], buf: &mut [u8]) -> seqsock_serve::Result<usize> {
    let start = Instant::now();
    loop {
        match request_response(path, msg, buf) {
            Err(ServeError::Transport(TransportError::Connect { .. }))
                if start.elapsed() < CONNECT_RETRY_TIMEOUT =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            other => return other,
        }
    }
}

fn oneshot_with_retry(path: &Path, msg: &[u8]) -> seqsock_serve::Result<usize> {
    let start = Instant::now();
    loop {
        match send_oneshot(path, msg) {
            Err(ServeError::Transport(TransportError::Connect { .. }))
                if start.elapsed() < CONNECT_RETRY_TIMEOUT =>
            {
                thread::sleep(Duration::from_millis(10));
            }
            other => return other,
        }
    }
}

fn connect_with_retry(path: &Path) -> seqsock_transport::Stream {
    let start = Instant::now();
    loop {
        match connect(path) {
            Ok(stream) => return stream,
            Err(_) if start.elapsed() < CONNECT_RETRY_TIMEOUT => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => panic!("connect never succeeded: {err}"),
        }
    }
}

fn assert_oneshot_delivered_once(tag: &str, payload: Vec<u8>) {
    let sock_path = make_sock_path(tag);

    let received = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
    let sink = received.clone();
    let server_path = sock_path.clone();
    let server = thread::spawn(move || {
        Server::new(&server_path).run(|_conn, msg| {
            sink.lock().expect("lock should not be poisoned").push(msg.to_vec());
            Control::Shutdown
        })
    });

    let sent = oneshot_with_retry(&sock_path, &payload).expect("oneshot should succeed");
    assert_eq!(sent, payload.len());

    server
        .join()
        .expect("server thread should finish")
        .expect("server should stop cleanly");

    let seen = received.lock().expect("lock should not be poisoned");
    assert_eq!(seen.len(), 1, "handler should run exactly once");
    assert_eq!(seen[0], payload);
    cleanup(&sock_path);
}

#[test]
fn oneshot_payload_reaches_handler_once() {
    let payload: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    assert_oneshot_delivered_once("oneshot", payload);
}

#[test]
fn oneshot_single_byte_payload() {
    assert_oneshot_delivered_once("oneshot-min", vec![0x2a]);
}

#[test]
fn oneshot_full_buffer_payload() {
    // Exactly the server-side receive buffer size.
    let payload: Vec<u8> = (0..8192u32).map(|i| (i % 251) as u8).collect();
    assert_oneshot_delivered_once("oneshot-max", payload);
}

#[test]
fn echoing_handler_round_trips_request() {
    let sock_path = make_sock_path("echo");
    let server_path = sock_path.clone();
    let server = thread::spawn(move || {
        Server::new(&server_path).run(|conn, msg| {
            conn.send(msg).expect("echo should succeed");
            Control::Shutdown
        })
    });

    let mut response = [0u8; 256];
    let len = rpc_with_retry(&sock_path, b"are you there?", &mut response)
        .expect("rpc should succeed");
    assert_eq!(&response[..len], b"are you there?");

    server
        .join()
        .expect("server thread should finish")
        .expect("server should stop cleanly");
    cleanup(&sock_path);
}

#[test]
fn close_connection_keeps_server_accepting() {
    let sock_path = make_sock_path("reaccept");
    let server_path = sock_path.clone();
    let server = thread::spawn(move || {
        Server::new(&server_path).run(|conn, msg| {
            conn.send(msg).expect("echo should succeed");
            if msg == b"bye" {
                Control::Shutdown
            } else {
                Control::CloseConnection
            }
        })
    });

    let mut response = [0u8; 64];
    let len = rpc_with_retry(&sock_path, b"first", &mut response).expect("first rpc should work");
    assert_eq!(&response[..len], b"first");

    // The previous connection was closed; a fresh one must still be accepted.
    let len = rpc_with_retry(&sock_path, b"bye", &mut response).expect("second rpc should work");
    assert_eq!(&response[..len], b"bye");

    server
        .join()
        .expect("server thread should finish")
        .expect("server should stop cleanly");
    cleanup(&sock_path);
}

#[test]
fn shutdown_outcome_is_clean_and_restart_rebinds() {
    let sock_path = make_sock_path("restart");
    let server_path = sock_path.clone();
    let server = thread::spawn(move || {
        Server::new(&server_path).run(|_conn, _msg| Control::Shutdown)
    });

    oneshot_with_retry(&sock_path, b"stop").expect("oneshot should succeed");
    server
        .join()
        .expect("server thread should finish")
        .expect("shutdown must be the clean-stop outcome");

    // The inode is left behind by the stopped server and replaced on the
    // next start at the same path.
    assert!(sock_path.exists(), "stale inode should remain after stop");
    let fresh = Listener::bind(&sock_path).expect("restart should rebind over the stale inode");
    drop(fresh);
    cleanup(&sock_path);
}

#[test]
fn read_error_yields_error_outcome() {
    let sock_path = make_sock_path("reset");
    let server_path = sock_path.clone();
    let server = thread::spawn(move || {
        Server::new(&server_path).run(|conn, _msg| {
            conn.send(b"reply you will never read")
                .expect("send should succeed");
            Control::Continue
        })
    });

    let mut client = connect_with_retry(&sock_path);
    client.send(b"trigger").expect("send should succeed");
    // Give the server time to write its reply, then close with the reply
    // still unread. That aborts the connection and the server's next read
    // fails with a genuine OS error, not an orderly shutdown.
    thread::sleep(Duration::from_millis(200));
    drop(client);

    let outcome = server.join().expect("server thread should finish");
    assert!(
        matches!(outcome, Err(ServeError::ConnectionRead(_))),
        "expected error outcome, got {outcome:?}"
    );
    cleanup(&sock_path);
}

#[test]
fn request_response_uses_exactly_one_connection() {
    let sock_path = make_sock_path("single");
    let capture = Arc::new(CaptureSink::new());
    let server_path = sock_path.clone();
    let events = Events::new(capture.clone());
    let server = thread::spawn(move || {
        Server::new(&server_path).with_events(events).run(|conn, msg| {
            conn.send(msg).expect("echo should succeed");
            Control::Shutdown
        })
    });

    let mut response = [0u8; 64];
    rpc_with_retry(&sock_path, b"count me", &mut response).expect("rpc should succeed");
    server
        .join()
        .expect("server thread should finish")
        .expect("server should stop cleanly");

    let accepts = capture
        .events()
        .iter()
        .filter(|event| event.origin == "accept" && event.name == "socket_connected")
        .count();
    assert_eq!(accepts, 1, "one round trip must consume one connection");
    cleanup(&sock_path);
}

#[test]
fn accept_timeout_does_not_prevent_late_clients() {
    let sock_path = make_sock_path("accept-tmo");
    let server_path = sock_path.clone();
    let server = thread::spawn(move || {
        // Short accept wait; the client shows up much later. The wait outcome
        // is observational and the accept must still pick the client up.
        Server::new(&server_path)
            .with_accept_timeout(Duration::from_millis(10))
            .run(|conn, msg| {
                conn.send(msg).expect("echo should succeed");
                Control::Shutdown
            })
    });

    thread::sleep(Duration::from_millis(150));
    let mut response = [0u8; 64];
    let len = rpc_with_retry(&sock_path, b"late", &mut response).expect("rpc should succeed");
    assert_eq!(&response[..len], b"late");

    server
        .join()
        .expect("server thread should finish")
        .expect("server should stop cleanly");
    cleanup(&sock_path);
}

#[test]
fn recv_timeout_waits_out_quiet_spells() {
    let sock_path = make_sock_path("recv-tmo");
    let server_path = sock_path.clone();
    let server = thread::spawn(move || {
        Server::new(&server_path)
            .with_recv_timeout(Duration::from_millis(20))
            .run(|conn, msg| {
                conn.send(msg).expect("echo should succeed");
                Control::Shutdown
            })
    });

    let mut client = connect_with_retry(&sock_path);
    // Several recv-wait timeouts elapse before any data shows up.
    thread::sleep(Duration::from_millis(120));
    client.send(b"slow").expect("send should succeed");

    let mut buf = [0u8; 64];
    let len = client.recv(&mut buf).expect("recv should succeed");
    assert_eq!(&buf[..len], b"slow");
    drop(client);

    server
        .join()
        .expect("server thread should finish")
        .expect("server should stop cleanly");
    cleanup(&sock_path);
}
