/// Errors that can occur in transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The endpoint address could not be used to open a link.
    #[error("invalid endpoint uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// A capability the transport needs is missing from the host environment.
    #[error("{0} is not supported in this environment")]
    Unsupported(String),

    /// The link refused to open.
    #[error("failed to open {uri}: {reason}")]
    Open { uri: String, reason: String },

    /// A write was attempted on a link that is not open.
    #[error("transport is not open")]
    NotOpen,

    /// The link failed while writing a frame.
    #[error("transport send failed: {0}")]
    Send(String),
}

pub type Result<T> = std::result::Result<T, TransportError>;
