//! Error types for CLI operations

use std::fmt;

use rtminer_client::{ClientError, ErrorKind};
use thiserror::Error;

/// CLI-specific errors with user-facing context
#[derive(Error, Debug)]
pub enum CliError {
    /// Session or server failure
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Invalid command arguments or shell input
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Terminal I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended while an answer was expected
    #[error("Input closed before the prediction finished")]
    InputClosed,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Get user-friendly suggestions for resolving the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        let Self::Client(err) = self else {
            return match self {
                Self::InvalidArguments(_) => vec!["Use --help to see expected usage"],
                _ => vec![],
            };
        };
        match err.kind() {
            ErrorKind::Config => vec![
                "The host must be a dotted IPv4 address such as 192.168.1.10",
                "The port must be between 1024 and 65535",
                "Set --host/--port or RTMINER_HOST/RTMINER_PORT",
            ],
            ErrorKind::NoNetwork => vec![
                "Check that this machine has a network connection",
                "Use --skip-network-check to connect anyway",
            ],
            ErrorKind::Connect => vec![
                "Check if the server is running",
                "Verify the host and port",
            ],
            ErrorKind::Io | ErrorKind::Decode | ErrorKind::Protocol => vec![
                "The connection was closed; run the command again",
                "Check server logs for errors",
            ],
            ErrorKind::ServerReported => vec![
                "Run `rtminer tables` or `rtminer files` to see what the server offers",
            ],
            ErrorKind::NoTreeLoaded => vec!["Learn or load a tree first"],
            ErrorKind::NotConnected => vec!["Connect first (`connect` in the shell)"],
            _ => vec![],
        }
    }

    /// Get the error category for colored output
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Client(err) => match err.kind() {
                ErrorKind::Config => ErrorCategory::Config,
                ErrorKind::NoNetwork
                | ErrorKind::Connect
                | ErrorKind::Io
                | ErrorKind::Aborted
                | ErrorKind::NotConnected => ErrorCategory::Connection,
                ErrorKind::Decode | ErrorKind::Protocol => ErrorCategory::Protocol,
                ErrorKind::ServerReported => ErrorCategory::Server,
                _ => ErrorCategory::User,
            },
            Self::InvalidArguments(_) | Self::InputClosed => ErrorCategory::User,
            Self::Json(_) | Self::Io(_) => ErrorCategory::System,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::User | ErrorCategory::Config => 2,
            _ => 1,
        }
    }
}

/// Error categories for colored output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Connection,
    User,
    Server,
    Protocol,
    System,
    Config,
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "Connection"),
            Self::User => write!(f, "User Input"),
            Self::Server => write!(f, "Server"),
            Self::Protocol => write!(f, "Protocol"),
            Self::System => write!(f, "System"),
            Self::Config => write!(f, "Configuration"),
            Self::Other => write!(f, "Error"),
        }
    }
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for CliError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
