use seqsock_serve::{request_response, RECV_BUFFER_SIZE};

use crate::cmd::{resolve_payload, CallArgs};
use crate::exit::{serve_error, CliResult, SUCCESS};
use crate::output::{print_payload, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.data, &args.file)?;

    let mut response = vec![0u8; RECV_BUFFER_SIZE];
    let len = request_response(&args.path, &payload, &mut response)
        .map_err(|err| serve_error("call failed", err))?;

    print_payload(&response[..len], format);
    Ok(SUCCESS)
}
