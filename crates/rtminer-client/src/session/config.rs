//! Session configuration.

use std::time::Duration;

use rtminer_transport::ChannelConfig;

/// Settings fixed when a session is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Hard bound on TCP connect plus the stream header exchange
    pub connect_timeout: Duration,
    /// Disable Nagle's algorithm on the server socket
    pub nodelay: bool,
    /// Capacity of the receive buffer
    pub buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            nodelay: true,
            buffer_size: 8192,
        }
    }
}

impl SessionConfig {
    /// Set connect timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable `TCP_NODELAY`
    #[must_use]
    pub const fn with_nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// Set receive buffer size
    #[must_use]
    pub const fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Channel settings derived from this configuration.
    ///
    /// Reads never time out: an unresponsive server is dealt with by
    /// disconnecting.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            connect_timeout_ms: u64::try_from(self.connect_timeout.as_millis())
                .unwrap_or(u64::MAX)
                .max(1),
            read_timeout_ms: None,
            nodelay: self.nodelay,
            buffer_size: self.buffer_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_hard_timeout() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        let channel = config.channel_config();
        assert_eq!(channel.connect_timeout_ms, 5000);
        assert_eq!(channel.read_timeout_ms, None);
        assert!(channel.nodelay);
    }

    #[test]
    fn test_builder_setters() {
        let config = SessionConfig::default()
            .with_connect_timeout(Duration::from_millis(1500))
            .with_nodelay(false)
            .with_buffer_size(512);
        let channel = config.channel_config();
        assert_eq!(channel.connect_timeout_ms, 1500);
        assert!(!channel.nodelay);
        assert_eq!(channel.buffer_size, 512);
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let config = SessionConfig::default().with_connect_timeout(Duration::from_micros(10));
        assert_eq!(config.channel_config().connect_timeout_ms, 1);
    }
}
