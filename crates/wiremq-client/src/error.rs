use std::fmt;

use wiremq_frame::{FrameError, FrameType};
use wiremq_transport::TransportError;

use crate::engine::State;

/// Stable numeric code attached to every client-visible failure.
///
/// Gaps in the numbering are codes reserved by the wire protocol family for
/// features this client does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    Ok = 0,
    ConnectTimeout = 1,
    PingTimeout = 4,
    InternalError = 5,
    SocketError = 7,
    SocketClose = 8,
    MalformedUtf = 9,
    Unsupported = 10,
    InvalidState = 11,
    InvalidType = 12,
    InvalidArgument = 13,
    ProtocolViolation = 16,
    MalformedUnicode = 17,
    LocalDisconnect = 18,
}

impl ErrorCode {
    /// The numeric value.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Upper-case identifier, e.g. `PING_TIMEOUT`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ConnectTimeout => "CONNECT_TIMEOUT",
            Self::PingTimeout => "PING_TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::SocketError => "SOCKET_ERROR",
            Self::SocketClose => "SOCKET_CLOSE",
            Self::MalformedUtf => "MALFORMED_UTF",
            Self::Unsupported => "UNSUPPORTED",
            Self::InvalidState => "INVALID_STATE",
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ProtocolViolation => "PROTOCOL_VIOLATION",
            Self::MalformedUnicode => "MALFORMED_UNICODE",
            Self::LocalDisconnect => "LOCAL_DISCONNECT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Errors returned synchronously by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Operation attempted in an incompatible connection state.
    #[error("invalid state for {operation}: client is {state}")]
    InvalidState {
        operation: &'static str,
        state: State,
    },

    /// Bad option or argument value.
    #[error("invalid argument {value} for {name}")]
    InvalidArgument { value: String, name: &'static str },

    /// Frame type that cannot be sent through this operation.
    #[error("invalid type {kind} for {operation}")]
    InvalidType {
        kind: FrameType,
        operation: &'static str,
    },

    /// Required capability is missing from the host environment.
    #[error("{0} is not supported in this environment")]
    Unsupported(String),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The background client task is gone.
    #[error("client task has stopped")]
    Stopped,
}

impl ClientError {
    /// Map to the stable numeric code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::InvalidArgument { .. } | Self::Json(_) => ErrorCode::InvalidArgument,
            Self::InvalidType { .. } => ErrorCode::InvalidType,
            Self::Unsupported(_) => ErrorCode::Unsupported,
            Self::Frame(FrameError::MalformedUtf { .. }) => ErrorCode::MalformedUtf,
            Self::Frame(FrameError::MalformedUnicode { .. }) => ErrorCode::MalformedUnicode,
            Self::Frame(FrameError::InvalidArgument { .. }) => ErrorCode::InvalidArgument,
            Self::Frame(_) | Self::Stopped => ErrorCode::InternalError,
            Self::Transport(TransportError::Unsupported(_)) => ErrorCode::Unsupported,
            Self::Transport(TransportError::InvalidUri { .. }) => ErrorCode::InvalidArgument,
            Self::Transport(_) => ErrorCode::SocketError,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Why a link was torn down.
///
/// Connection-level failures are never returned from engine calls; they are
/// reported through client events carrying one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    pub code: ErrorCode,
    pub message: String,
}

impl DisconnectReason {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn connect_timeout() -> Self {
        Self::new(ErrorCode::ConnectTimeout, "connect timed out")
    }

    pub fn ping_timeout() -> Self {
        Self::new(ErrorCode::PingTimeout, "ping timed out")
    }

    pub fn socket_error(detail: impl fmt::Display) -> Self {
        Self::new(ErrorCode::SocketError, format!("socket error: {detail}"))
    }

    pub fn socket_close() -> Self {
        Self::new(ErrorCode::SocketClose, "socket closed")
    }

    pub fn protocol_violation(kind: FrameType) -> Self {
        Self::new(
            ErrorCode::ProtocolViolation,
            format!("invalid message type {kind}"),
        )
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, format!("internal error: {detail}"))
    }

    pub fn local_disconnect() -> Self {
        Self::new(ErrorCode::LocalDisconnect, "disconnected by client")
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<&ClientError> for DisconnectReason {
    fn from(err: &ClientError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_keep_protocol_numbering() {
        assert_eq!(ErrorCode::Ok.code(), 0);
        assert_eq!(ErrorCode::ConnectTimeout.code(), 1);
        assert_eq!(ErrorCode::PingTimeout.code(), 4);
        assert_eq!(ErrorCode::InternalError.code(), 5);
        assert_eq!(ErrorCode::SocketError.code(), 7);
        assert_eq!(ErrorCode::SocketClose.code(), 8);
        assert_eq!(ErrorCode::MalformedUtf.code(), 9);
        assert_eq!(ErrorCode::Unsupported.code(), 10);
        assert_eq!(ErrorCode::InvalidState.code(), 11);
        assert_eq!(ErrorCode::InvalidType.code(), 12);
        assert_eq!(ErrorCode::InvalidArgument.code(), 13);
        assert_eq!(ErrorCode::ProtocolViolation.code(), 16);
        assert_eq!(ErrorCode::MalformedUnicode.code(), 17);
        assert_eq!(ErrorCode::LocalDisconnect.code(), 18);
    }

    #[test]
    fn nested_errors_map_to_codes() {
        let err = ClientError::from(FrameError::MalformedUtf { bytes: vec![0xc3] });
        assert_eq!(err.code(), ErrorCode::MalformedUtf);

        let err = ClientError::from(TransportError::Unsupported("tokio runtime".to_string()));
        assert_eq!(err.code(), ErrorCode::Unsupported);

        let err = ClientError::from(TransportError::NotOpen);
        assert_eq!(err.code(), ErrorCode::SocketError);

        let err = ClientError::InvalidState {
            operation: "send",
            state: State::Idle,
        };
        assert_eq!(err.code(), ErrorCode::InvalidState);
        assert_eq!(err.to_string(), "invalid state for send: client is idle");
    }

    #[test]
    fn disconnect_reason_display() {
        let reason = DisconnectReason::protocol_violation(FrameType::DISCONNECT);
        assert_eq!(reason.code, ErrorCode::ProtocolViolation);
        assert_eq!(
            reason.to_string(),
            "PROTOCOL_VIOLATION (16): invalid message type DISCONNECT (13)"
        );
    }
}
