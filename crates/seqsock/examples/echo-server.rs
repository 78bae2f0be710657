//! Minimal sequential echo server.
//!
//! Run with: cargo run --example echo-server -- /tmp/echo.sock
//! Then from another terminal: cargo run --features cli -- call /tmp/echo.sock --data hi

use seqsock::serve::{Control, Server};

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/echo.sock".to_string());

    eprintln!("echoing on {path}; send \"quit\" to stop");
    let outcome = Server::new(&path).run(|conn, msg| {
        if conn.send(msg).is_err() {
            return Control::CloseConnection;
        }
        if msg == b"quit" {
            Control::Shutdown
        } else {
            Control::CloseConnection
        }
    });

    match outcome {
        Ok(()) => eprintln!("clean stop"),
        Err(err) => eprintln!("server failed: {err}"),
    }
}
