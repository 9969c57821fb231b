use std::fmt;
use std::io;

use wiremq_client::{ClientError, DisconnectReason, ErrorCode};
use wiremq_frame::FrameError;

// Exit code constants aligned with sysexits-style semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Exit code for a protocol error code.
pub fn exit_code(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::Ok => SUCCESS,
        ErrorCode::ConnectTimeout | ErrorCode::PingTimeout => TIMEOUT,
        ErrorCode::SocketError | ErrorCode::SocketClose => TRANSPORT_ERROR,
        ErrorCode::MalformedUtf | ErrorCode::MalformedUnicode => DATA_INVALID,
        ErrorCode::InvalidState | ErrorCode::InvalidType | ErrorCode::InvalidArgument => USAGE,
        ErrorCode::ProtocolViolation | ErrorCode::LocalDisconnect => FAILURE,
        ErrorCode::InternalError | ErrorCode::Unsupported => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => USAGE,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    CliError::new(exit_code(err.code()), format!("{context}: {err}"))
}

pub fn reason_error(context: &str, reason: &DisconnectReason) -> CliError {
    CliError::new(exit_code(reason.code), format!("{context}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_protocol_codes() {
        assert_eq!(exit_code(ErrorCode::ConnectTimeout), TIMEOUT);
        assert_eq!(exit_code(ErrorCode::SocketClose), TRANSPORT_ERROR);
        assert_eq!(exit_code(ErrorCode::MalformedUtf), DATA_INVALID);
        assert_eq!(exit_code(ErrorCode::InvalidType), USAGE);
        assert_eq!(exit_code(ErrorCode::ProtocolViolation), FAILURE);
        assert_eq!(exit_code(ErrorCode::Unsupported), INTERNAL);
    }

    #[test]
    fn client_errors_keep_context() {
        let err = client_error(
            "send failed",
            ClientError::Frame(FrameError::MalformedLength),
        );
        assert_eq!(err.code, INTERNAL);
        assert!(err.message.starts_with("send failed: "));

        let err = reason_error("connect failed", &DisconnectReason::connect_timeout());
        assert_eq!(err.code, TIMEOUT);
    }
}
