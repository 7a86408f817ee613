//! Session lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the session is in its lifecycle.
///
/// ```text
/// Disconnected ─connect─▶ Connecting ─▶ Idle ─request─▶ Busy ─reply─▶ Idle
///                                        │                 └─fault─▶ Disconnected
///                                        └─begin_prediction─▶ Predicting ─done─▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No channel.
    Disconnected,
    /// The channel is being opened.
    Connecting,
    /// Connected, no request in flight.
    Idle,
    /// A request is on the wire.
    Busy,
    /// A prediction dialog holds the channel lease.
    Predicting,
    /// `disconnect` is severing the channel.
    Disconnecting,
}

impl SessionState {
    /// True in states that own a live channel.
    pub fn has_channel(self) -> bool {
        matches!(self, Self::Idle | Self::Busy | Self::Predicting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Predicting => write!(f, "predicting"),
            Self::Disconnecting => write!(f, "disconnecting"),
        }
    }
}
