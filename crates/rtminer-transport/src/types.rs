//! Channel state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Represents the current state of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    /// The channel is not connected.
    Disconnected,
    /// The TCP connection or stream handshake is in progress.
    Connecting,
    /// The channel is ready to exchange values.
    Connected,
    /// The channel is being torn down.
    Disconnecting,
    /// The channel hit an unrecoverable error and must be closed.
    Failed {
        /// A description of the failure reason.
        reason: String,
    },
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnecting => write!(f, "disconnecting"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}
