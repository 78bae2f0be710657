use seqsock_serve::send_oneshot;

use crate::cmd::{resolve_payload, SendArgs};
use crate::exit::{serve_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args.data, &args.file)?;
    let sent =
        send_oneshot(&args.path, &payload).map_err(|err| serve_error("send failed", err))?;
    tracing::info!(sent, "payload sent");
    Ok(SUCCESS)
}
