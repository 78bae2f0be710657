use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a sequential echo server.
    Serve(ServeArgs),
    /// Send a one-shot message.
    Send(SendArgs),
    /// Send a request and print the response.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Send(args) => send::run(args),
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Readiness wait before each accept, in milliseconds (diagnostic only).
    #[arg(long, value_name = "MS")]
    pub accept_timeout: Option<u64>,
    /// Readiness wait before each receive, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub recv_timeout: Option<u64>,
    /// Stop cleanly after echoing N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// String payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// String payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

/// Resolve `--data`/`--file` into payload bytes.
pub fn resolve_payload(data: &Option<String>, file: &Option<PathBuf>) -> CliResult<Vec<u8>> {
    use crate::exit::{io_error, CliError, USAGE};

    if let Some(data) = data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = file {
        return std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --data or --file is required"))
}
