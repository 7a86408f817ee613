//! Transport error types.

use std::time::Duration;

use rtminer_wire::CodecError;
use thiserror::Error;

/// A specialized `Result` type for channel operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors raised by an [`ObjectChannel`](crate::ObjectChannel).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection establishment timed out.
    #[error("Connection timed out after {timeout:?} for operation: {operation}")]
    ConnectionTimeout {
        /// The operation that timed out
        operation: String,
        /// The timeout that was exceeded
        timeout: Duration,
    },

    /// The peer's stream header was missing or wrong.
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// The peer closed or reset the connection.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A value could not be encoded.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Bytes arrived that do not form a valid value.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The channel was already closed or has failed.
    #[error("Channel closed")]
    Closed,

    /// The channel was configured with invalid parameters.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An underlying I/O error occurred.
    #[error("IO error: {0}")]
    Io(String),
}

impl TransportError {
    /// True when the received bytes were malformed, as opposed to the link failing.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::ProtocolError(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected => Self::ConnectionLost(err.to_string()),
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(io) => io.into(),
            CodecError::UnexpectedEof => Self::ConnectionLost("peer closed the stream".into()),
            CodecError::Unencodable(_) => Self::SerializationFailed(err.to_string()),
            other => Self::ProtocolError(other.to_string()),
        }
    }
}
