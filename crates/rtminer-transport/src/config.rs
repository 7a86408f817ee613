//! Channel configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::channel::ObjectChannel;
use crate::error::{TransportError, TransportResult};
use crate::metrics::AtomicMetrics;

/// Settings applied when a channel is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Bound on TCP connect plus the header exchange, in milliseconds
    pub connect_timeout_ms: u64,
    /// Bound on each blocking read after the handshake; `None` waits forever
    pub read_timeout_ms: Option<u64>,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
    /// Capacity of the receive buffer
    pub buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            read_timeout_ms: None,
            nodelay: true,
            buffer_size: 8192,
        }
    }
}

impl ChannelConfig {
    /// Connect timeout as a [`Duration`].
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Rejects settings the socket layer cannot honour.
    pub fn validate(&self) -> TransportResult<()> {
        if self.connect_timeout_ms == 0 {
            return Err(TransportError::ConfigurationError(
                "connect timeout must be positive".into(),
            ));
        }
        if self.read_timeout_ms == Some(0) {
            return Err(TransportError::ConfigurationError(
                "read timeout must be positive".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(TransportError::ConfigurationError(
                "buffer size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ObjectChannel`]
#[derive(Debug, Default)]
pub struct ChannelBuilder {
    config: ChannelConfig,
    metrics: Option<Arc<AtomicMetrics>>,
}

impl ChannelBuilder {
    /// Create a builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    #[must_use]
    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Set connect timeout
    #[must_use]
    pub const fn connect_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.connect_timeout_ms = timeout;
        self
    }

    /// Set read timeout
    #[must_use]
    pub const fn read_timeout_ms(mut self, timeout: Option<u64>) -> Self {
        self.config.read_timeout_ms = timeout;
        self
    }

    /// Enable or disable `TCP_NODELAY`
    #[must_use]
    pub const fn nodelay(mut self, enabled: bool) -> Self {
        self.config.nodelay = enabled;
        self
    }

    /// Set receive buffer size
    #[must_use]
    pub const fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Share counters with other channels
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<AtomicMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Connect to `addr` and exchange stream headers.
    pub fn open(self, addr: SocketAddr) -> TransportResult<ObjectChannel> {
        self.config.validate()?;
        let metrics = self.metrics.unwrap_or_default();
        ObjectChannel::open(addr, &self.config, metrics)
    }
}
