use std::fs;
use std::time::Duration;

use tracing::{debug, info};
use wiremq_client::{Client, ClientEvent, DeliveryToken};
use wiremq_frame::{Frame, Payload};

use crate::cmd::{parse_duration, session, SendArgs};
use crate::exit::{client_error, io_error, reason_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let runtime = session::runtime()?;
    let reply = runtime.block_on(async {
        let mut client = session::connect(&args.connect).await?;
        let result = exchange(&mut client, &args, payload, wait_timeout).await;
        session::close(client).await;
        result
    })?;

    if let Some(frame) = reply {
        print_frame(&frame, format);
    }
    Ok(SUCCESS)
}

async fn exchange(
    client: &mut Client,
    args: &SendArgs,
    payload: Payload,
    timeout: Duration,
) -> CliResult<Option<Frame>> {
    let token = client
        .send_confirmed(args.kind, payload)
        .await
        .map_err(|err| client_error("send failed", err))?;
    debug!(%token, kind = %args.kind, "queued");

    wait_for_delivery(client, token, args.wait, timeout).await
}

/// Wait until `token` is written and, if `wait` is set, for the next
/// arriving frame.
async fn wait_for_delivery(
    client: &mut Client,
    token: DeliveryToken,
    wait: bool,
    timeout: Duration,
) -> CliResult<Option<Frame>> {
    let mut delivered = false;
    let mut arrived = None;

    loop {
        match session::next_event(client, timeout).await? {
            ClientEvent::MessageDelivered(done) if done == token => {
                info!(%token, "delivered");
                delivered = true;
            }
            ClientEvent::MessageArrived(frame) if wait && arrived.is_none() => {
                arrived = Some(frame);
            }
            ClientEvent::ConnectionLost { reason } => {
                return Err(reason_error("connection lost", &reason));
            }
            ClientEvent::ConnectFailed { reason, .. } => {
                return Err(reason_error("reconnect failed", &reason));
            }
            other => debug!(?other, "ignoring event"),
        }

        if delivered && (!wait || arrived.is_some()) {
            return Ok(arrived);
        }
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Payload> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(Payload::text(json.as_str()));
    }
    if let Some(data) = &args.data {
        return Ok(Payload::text(data.as_str()));
    }
    if let Some(hex) = &args.hex {
        return Payload::from_hex(hex)
            .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")));
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return Ok(Payload::bytes(bytes));
    }
    Ok(Payload::bytes(Vec::new()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cmd::{Command, ConnectArgs};
    use wiremq_frame::FrameType;

    #[derive(Parser)]
    struct Harness {
        #[command(subcommand)]
        command: Command,
    }

    fn send_args(extra: &[&str]) -> SendArgs {
        let mut argv = vec!["wiremq", "send", "ws://127.0.0.1:9001"];
        argv.extend_from_slice(extra);
        match Harness::try_parse_from(argv).unwrap().command {
            Command::Send(args) => args,
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn payload_from_text_json_and_hex() {
        assert_eq!(
            resolve_payload(&send_args(&["--data", "hi"])).unwrap(),
            Payload::text("hi")
        );
        assert_eq!(
            resolve_payload(&send_args(&["--json", "{\"t\":1}"])).unwrap(),
            Payload::text("{\"t\":1}")
        );
        assert_eq!(
            resolve_payload(&send_args(&["--hex", "de ad"])).unwrap(),
            Payload::bytes(vec![0xde, 0xad])
        );
        assert!(resolve_payload(&send_args(&[])).unwrap().is_empty());
    }

    #[test]
    fn invalid_payloads_are_usage_errors() {
        let err = resolve_payload(&send_args(&["--json", "{nope"])).unwrap_err();
        assert_eq!(err.code, USAGE);
        let err = resolve_payload(&send_args(&["--hex", "zz"])).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn payload_from_file() {
        let path = std::env::temp_dir().join(format!("wiremq-payload-{}.bin", std::process::id()));
        fs::write(&path, [1u8, 2, 3]).unwrap();
        let args = send_args(&["--file", path.to_str().unwrap()]);
        let payload = resolve_payload(&args);
        let _ = fs::remove_file(&path);
        assert_eq!(payload.unwrap(), Payload::bytes(vec![1, 2, 3]));

        let missing = send_args(&["--file", "/nonexistent/wiremq-payload.bin"]);
        assert_eq!(resolve_payload(&missing).unwrap_err().code, USAGE);
    }

    #[test]
    fn type_defaults_to_send() {
        let args = send_args(&[]);
        assert_eq!(args.kind, FrameType::SEND);
        let ConnectArgs { uris, .. } = args.connect;
        assert_eq!(uris, vec!["ws://127.0.0.1:9001".to_string()]);
    }
}
