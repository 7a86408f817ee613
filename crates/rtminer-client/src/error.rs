//! Client error types.
//!
//! Every failure a session operation can report maps onto one [`ErrorKind`].
//! Only I/O, decode and protocol failures tear the connection down.

use std::fmt;

use rtminer_transport::TransportError;
use rtminer_wire::CodecError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for session operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors reported by the session, the prediction dialog and the dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// Invalid or unset host/port, or endpoint change while connected.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host has no route to the server.
    #[error("No network route to {0}")]
    NoNetwork(String),

    /// TCP connect or stream handshake failed, including timeout.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// The stream broke mid-exchange.
    #[error("I/O error: {0}")]
    Io(String),

    /// A reply did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A reply tag or status lay outside the documented set.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The operation was cancelled by `disconnect`.
    #[error("Operation aborted by disconnect")]
    Aborted,

    /// The server answered with a well-formed failure status or sentinel.
    #[error("Server reported: {0}")]
    ServerReported(String),

    /// No live connection.
    #[error("Not connected")]
    NotConnected,

    /// A prediction dialog holds the channel.
    #[error("Session busy: a prediction dialog holds the channel")]
    Busy,

    /// Prediction requested before a tree was loaded with status `ok`.
    #[error("No tree loaded")]
    NoTreeLoaded,

    /// A request argument was rejected before anything was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A child index outside `[0, children)`.
    #[error("Choice {index} is out of range for {children} children")]
    InvalidChoice {
        /// Index the caller picked
        index: u32,
        /// Number of children at the current node
        children: u32,
    },
}

/// Flat classification of [`ClientError`], suitable for UI dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ErrorKind {
    Config,
    NoNetwork,
    Connect,
    Io,
    Decode,
    Protocol,
    Aborted,
    ServerReported,
    NotConnected,
    Busy,
    NoTreeLoaded,
    InvalidArgument,
    InvalidChoice,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Config => "config",
            Self::NoNetwork => "no-network",
            Self::Connect => "connect",
            Self::Io => "io",
            Self::Decode => "decode",
            Self::Protocol => "protocol",
            Self::Aborted => "aborted",
            Self::ServerReported => "server-reported",
            Self::NotConnected => "not-connected",
            Self::Busy => "busy",
            Self::NoTreeLoaded => "no-tree-loaded",
            Self::InvalidArgument => "invalid-argument",
            Self::InvalidChoice => "invalid-choice",
        };
        f.write_str(name)
    }
}

impl ClientError {
    /// The flat kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::NoNetwork(_) => ErrorKind::NoNetwork,
            Self::Connect(_) => ErrorKind::Connect,
            Self::Io(_) => ErrorKind::Io,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Aborted => ErrorKind::Aborted,
            Self::ServerReported(_) => ErrorKind::ServerReported,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Busy => ErrorKind::Busy,
            Self::NoTreeLoaded => ErrorKind::NoTreeLoaded,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidChoice { .. } => ErrorKind::InvalidChoice,
        }
    }

    /// True when the stream can no longer be trusted and the channel must go.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Decode(_) | Self::Protocol(_))
    }

    /// Builds a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionFailed(_)
            | TransportError::ConnectionTimeout { .. }
            | TransportError::Handshake(_) => Self::Connect(err.to_string()),
            TransportError::ProtocolError(msg) | TransportError::SerializationFailed(msg) => {
                Self::Decode(msg)
            }
            TransportError::ConfigurationError(msg) => Self::Config(msg),
            TransportError::Closed => Self::NotConnected,
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        Self::Decode(err.to_string())
    }
}
