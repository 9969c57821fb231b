use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use wiremq_client::ConnectOptions;
use wiremq_frame::FrameType;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod listen;
pub mod send;
pub mod session;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, send a single frame, and optionally wait for a reply.
    Send(SendArgs),
    /// Connect and print arriving frames.
    Listen(ListenArgs),
    /// Decode a hex dump of wire bytes into frames.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Endpoint URIs, tried in order on failover (comma-separated via env).
    #[arg(required = true, env = "WIREMQ_URI", value_delimiter = ',')]
    pub uris: Vec<String>,
    /// Client identity sent in the CONNECT payload.
    #[arg(long, env = "WIREMQ_USER")]
    pub user: Option<String>,
    /// Access token sent in the CONNECT payload.
    #[arg(long, env = "WIREMQ_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Heartbeat interval (e.g. 5s, 500ms). Defaults to 5s.
    #[arg(long)]
    pub keepalive: Option<String>,
    /// Time allowed per endpoint for the connection to be acknowledged.
    #[arg(long, default_value = "10s")]
    pub connect_timeout: String,
}

impl ConnectArgs {
    pub fn options(&self) -> CliResult<ConnectOptions> {
        let mut options = ConnectOptions::with_uris(self.uris.iter().cloned())
            .with_timeout(parse_duration(&self.connect_timeout)?);
        options.user_name = self.user.clone();
        options.password = self.password.clone();
        if let Some(keepalive) = &self.keepalive {
            options = options.with_keep_alive_interval(parse_duration(keepalive)?);
        }
        Ok(options)
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Frame type, by name (send, action, ...) or number.
    #[arg(long = "type", short = 't', default_value = "send", value_parser = parse_frame_type)]
    pub kind: FrameType,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "hex", "file"])]
    pub json: Option<String>,
    /// Text payload.
    #[arg(long, conflicts_with_all = ["json", "hex", "file"])]
    pub data: Option<String>,
    /// Binary payload as hex pairs.
    #[arg(long, conflicts_with_all = ["json", "data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data", "hex"])]
    pub file: Option<PathBuf>,
    /// Wait for one arriving frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for delivery and, with --wait, a reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Only print these frame types (comma-separated names or numbers).
    #[arg(long, value_delimiter = ',', value_parser = parse_frame_type)]
    pub types: Option<Vec<FrameType>>,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex pairs of wire bytes; may be split across arguments.
    #[arg(required = true, num_args = 1..)]
    pub hex: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_frame_type(input: &str) -> Result<FrameType, String> {
    let input = input.trim();
    if let Ok(value) = input.parse::<u8>() {
        if value > 0x0F {
            return Err(format!("frame type {value} does not fit in 4 bits"));
        }
        return Ok(FrameType::new(value));
    }
    FrameType::from_name(input).ok_or_else(|| format!("unknown frame type '{input}'"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
