use wiremq_frame::utf8::hex_to_bytes;
use wiremq_frame::{Frame, FrameAssembler};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frames, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = decode_hex(&args.hex.join(" "))?;
    print_frames(&frames, format);
    Ok(SUCCESS)
}

fn decode_hex(hex: &str) -> CliResult<Vec<Frame>> {
    let bytes = hex_to_bytes(hex).map_err(|err| frame_error("invalid hex", err))?;
    let mut assembler = FrameAssembler::new();
    let frames = assembler
        .push(&bytes)
        .map_err(|err| frame_error("decode failed", err))?;

    if assembler.pending() > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "decode failed: {} trailing bytes do not form a complete frame",
                assembler.pending()
            ),
        ));
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use wiremq_frame::FrameType;

    use super::*;

    #[test]
    fn decodes_concatenated_frames() {
        // CONNACK, then SEND_REPLY id=1 payload "ok".
        let frames = decode_hex("10 00 50 04 00 01 6f 6b").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].kind, FrameType::CONNACK);
        assert_eq!(frames[1].kind, FrameType::SEND_REPLY);
        assert_eq!(frames[1].message_identifier, Some(1));
        assert_eq!(frames[1].payload.as_ref().unwrap().as_text().unwrap(), "ok");
    }

    #[test]
    fn trailing_partial_frame_is_invalid() {
        let err = decode_hex("20 00 40 05 00").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("3 trailing bytes"));
    }

    #[test]
    fn bad_hex_is_invalid() {
        assert_eq!(decode_hex("2").unwrap_err().code, DATA_INVALID);
    }
}
