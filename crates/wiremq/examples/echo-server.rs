//! Minimal wiremq echo server: acknowledges CONNECT, answers PINGREQ, and
//! echoes every SEND back as a SEND_REPLY with the same identifier.
//!
//! Run with:
//!   cargo run --example echo-server --features async
//!
//! In another terminal:
//!   cargo run --features cli -- send ws://127.0.0.1:9001 \
//!     --user device-7 --data '{"hello":"world"}' --wait

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use wiremq::frame::{Frame, FrameAssembler, FrameType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:9001").await?;
    eprintln!("Listening on ws://{}", listener.local_addr()?);

    loop {
        let (tcp, addr) = listener.accept().await?;
        eprintln!("Peer connected: {addr}");
        tokio::spawn(async move {
            if let Err(e) = serve(tcp).await {
                eprintln!("Peer {addr} failed: {e}");
            }
            eprintln!("Peer disconnected: {addr}");
        });
    }
}

async fn serve(tcp: TcpStream) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut ws = accept_async(tcp).await?;
    let mut assembler = FrameAssembler::new();

    while let Some(message) = ws.next().await {
        let Message::Binary(data) = message? else {
            continue;
        };
        for frame in assembler.push(&data)? {
            eprintln!("Received {} id={:?}", frame.kind, frame.message_identifier);
            let answer = match frame.kind {
                FrameType::CONNECT => Frame::new(FrameType::CONNACK),
                FrameType::PINGREQ => Frame::new(FrameType::PINGRESP),
                FrameType::SEND => {
                    let mut reply = Frame::new(FrameType::SEND_REPLY)
                        .with_identifier(frame.message_identifier.unwrap_or(0));
                    reply.payload = frame.payload;
                    reply
                }
                FrameType::DISCONNECT => return Ok(()),
                _ => continue,
            };
            ws.send(Message::Binary(answer.encode()?)).await?;
        }
    }
    Ok(())
}
