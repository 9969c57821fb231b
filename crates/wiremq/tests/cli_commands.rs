#![cfg(feature = "cli")]

use std::net::TcpListener as StdTcpListener;
use std::process::Command;
use std::sync::mpsc;
use std::thread;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use wiremq::frame::{Frame, FrameAssembler, FrameType};

fn wiremq() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wiremq"));
    cmd.env_remove("WIREMQ_URI")
        .env_remove("WIREMQ_USER")
        .env_remove("WIREMQ_PASSWORD")
        .arg("--log-level")
        .arg("off");
    cmd
}

/// Serve one WebSocket session that acknowledges CONNECT and echoes SEND
/// frames back as SEND_REPLY. Returns the bound address.
fn spawn_echo_server() -> String {
    let (addr_tx, addr_rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().expect("runtime should build");
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            addr_tx
                .send(listener.local_addr().expect("addr").to_string())
                .expect("addr send");

            let (tcp, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(tcp).await.expect("handshake");
            let mut assembler = FrameAssembler::new();
            while let Some(Ok(message)) = ws.next().await {
                let Message::Binary(data) = message else {
                    continue;
                };
                for frame in assembler.push(&data).expect("valid frames") {
                    let answer = match frame.kind {
                        FrameType::CONNECT => Frame::new(FrameType::CONNACK),
                        FrameType::SEND => {
                            let mut reply = Frame::new(FrameType::SEND_REPLY)
                                .with_identifier(frame.message_identifier.unwrap_or(0));
                            reply.payload = frame.payload;
                            reply
                        }
                        FrameType::DISCONNECT => return,
                        _ => continue,
                    };
                    let wire = answer.encode().expect("encode");
                    if ws.send(Message::Binary(wire)).await.is_err() {
                        return;
                    }
                }
            }
        });
    });
    addr_rx.recv().expect("server should report its address")
}

fn unused_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("ephemeral port")
}

#[test]
fn decode_prints_frames_as_json() {
    let output = wiremq()
        .args(["--format", "json", "decode", "10 00", "50 04 00 07 6f 6b"])
        .output()
        .expect("decode should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"kind_name\":\"CONNACK\""));
    assert!(lines[1].contains("\"message_identifier\":7"));
    assert!(lines[1].contains("\"payload\":\"ok\""));
}

#[test]
fn decode_partial_frame_returns_60() {
    let output = wiremq()
        .args(["decode", "40 05 00 01"])
        .output()
        .expect("decode should run");

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("trailing bytes"));
}

#[test]
fn version_reports_package_version() {
    let output = wiremq().arg("version").output().expect("version should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("wiremq {}", env!("CARGO_PKG_VERSION"))
    );

    let output = wiremq()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");
    assert!(String::from_utf8_lossy(&output.stdout).contains("protocol_version: 0"));
}

#[test]
fn send_to_refused_port_returns_3() {
    let uri = format!("ws://127.0.0.1:{}", unused_port());
    let output = wiremq()
        .args(["send", &uri, "--data", "hello", "--connect-timeout", "3s"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("SOCKET_ERROR"));
}

#[test]
fn send_with_wait_prints_reply() {
    let addr = spawn_echo_server();
    let output = wiremq()
        .args([
            "--format",
            "json",
            "send",
            &format!("ws://{addr}"),
            "--user",
            "device-7",
            "--password",
            "s3cret",
            "--data",
            "{\"t\":21.5}",
            "--wait",
        ])
        .output()
        .expect("send should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"kind_name\":\"SEND_REPLY\""));
    assert!(stdout.contains("\"message_identifier\":1"));
}

#[test]
fn send_rejects_control_type() {
    let addr = spawn_echo_server();
    let output = wiremq()
        .args(["send", &format!("ws://{addr}"), "--type", "pingreq"])
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("send failed"));
}
