use std::time::Duration;

use seqsock_serve::{Control, Server};

use crate::cmd::ServeArgs;
use crate::exit::{serve_error, CliResult, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let mut server = Server::new(&args.path);
    if let Some(ms) = args.accept_timeout {
        server = server.with_accept_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = args.recv_timeout {
        server = server.with_recv_timeout(Duration::from_millis(ms));
    }

    let mut echoed = 0usize;
    server
        .run(|conn, msg| {
            if let Err(err) = conn.send(msg) {
                tracing::warn!(error = %err, "echo failed");
                return Control::CloseConnection;
            }
            echoed = echoed.saturating_add(1);
            match args.count {
                Some(count) if echoed >= count => Control::Shutdown,
                _ => Control::Continue,
            }
        })
        .map_err(|err| serve_error("serve failed", err))?;

    Ok(SUCCESS)
}
