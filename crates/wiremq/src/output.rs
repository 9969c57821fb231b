use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wiremq_frame::utf8::bytes_to_hex;
use wiremq_frame::Frame;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: u8,
    kind_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_identifier: Option<u16>,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_frames(frames: &[Frame], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if !frames.is_empty() {
                println!("{}", frame_table(frames));
            }
        }
        _ => {
            for frame in frames {
                print_frame(frame, format);
            }
        }
    }
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                kind: frame.kind.value(),
                kind_name: frame.kind.name(),
                message_identifier: frame.message_identifier,
                payload_size: payload_size(frame),
                payload: payload_preview(frame),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            println!("{}", frame_table(std::slice::from_ref(frame)));
        }
        OutputFormat::Pretty => {
            println!(
                "type={} id={} size={} payload={}",
                frame.kind,
                identifier_label(frame),
                payload_size(frame),
                payload_preview(frame)
            );
        }
        OutputFormat::Raw => {
            if let Some(payload) = &frame.payload {
                print_raw(&payload.as_bytes());
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn frame_table(frames: &[Frame]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["TYPE", "ID", "SIZE", "PAYLOAD"]);
    for frame in frames {
        table.add_row(vec![
            frame.kind.to_string(),
            identifier_label(frame),
            payload_size(frame).to_string(),
            payload_preview(frame),
        ]);
    }
    table
}

fn identifier_label(frame: &Frame) -> String {
    frame
        .message_identifier
        .map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn payload_size(frame: &Frame) -> usize {
    frame.payload.as_ref().map_or(0, |payload| payload.byte_len())
}

fn payload_preview(frame: &Frame) -> String {
    let Some(payload) = &frame.payload else {
        return String::new();
    };
    match payload.as_text() {
        Ok(text) => text.into_owned(),
        Err(_) => format!("<binary {} bytes: {}>", payload.byte_len(), bytes_to_hex(&payload.as_bytes())),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
