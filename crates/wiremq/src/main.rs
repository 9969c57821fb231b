mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "wiremq", version, about = "wiremq messaging client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "wiremq",
            "send",
            "ws://a:9001,ws://b:9001",
            "--type",
            "action",
            "--data",
            "hello",
            "--wait",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.connect.uris.len(), 2);
        assert_eq!(args.kind, wiremq_frame::FrameType::ACTION);
        assert!(args.wait);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "wiremq",
            "send",
            "ws://a:9001",
            "--hex",
            "00 01",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_unknown_frame_type() {
        let err = Cli::try_parse_from(["wiremq", "send", "ws://a:9001", "--type", "publish"])
            .expect_err("unknown type should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_listen_and_decode() {
        let cli = Cli::try_parse_from([
            "wiremq",
            "listen",
            "ws://a:9001",
            "--types",
            "send_reply,action",
            "--count",
            "2",
        ])
        .expect("listen args should parse");
        let Command::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.types.map(|types| types.len()), Some(2));

        let cli = Cli::try_parse_from(["wiremq", "--format", "json", "decode", "20", "00"])
            .expect("decode args should parse");
        assert!(matches!(cli.command, Command::Decode(args) if args.hex.len() == 2));
    }
}
