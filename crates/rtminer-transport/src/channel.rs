//! A connected object-stream channel.

use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use bytes::BytesMut;
use rtminer_wire::{CodecError, ObjectReader, ObjectWriter, Value};
use tracing::{debug, trace, warn};

use crate::config::ChannelConfig;
use crate::error::{TransportError, TransportResult};
use crate::metrics::{AtomicMetrics, TransportMetrics};
use crate::types::TransportState;

/// Read half of the socket, counting bytes into the shared metrics.
#[derive(Debug)]
struct CountingStream {
    inner: TcpStream,
    metrics: Arc<AtomicMetrics>,
}

impl Read for CountingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.metrics
            .bytes_received
            .fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Severs a channel from another thread.
///
/// A thread blocked in [`ObjectChannel::receive`] returns with
/// [`TransportError::ConnectionLost`] once the handle is used.
#[derive(Debug)]
pub struct ShutdownHandle {
    stream: TcpStream,
}

impl ShutdownHandle {
    /// Shuts down both directions of the socket. Errors are ignored.
    pub fn sever(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!("Shutdown after close: {}", e);
        }
    }
}

/// One TCP connection speaking the object serialization stream protocol.
///
/// Writes are flushed per value. Reads block; use a [`ShutdownHandle`] to
/// interrupt them.
#[derive(Debug)]
pub struct ObjectChannel {
    peer: SocketAddr,
    stream: TcpStream,
    reader: ObjectReader<BufReader<CountingStream>>,
    writer: ObjectWriter,
    scratch: BytesMut,
    state: TransportState,
    metrics: Arc<AtomicMetrics>,
}

impl ObjectChannel {
    /// Connects to `addr` and exchanges stream headers.
    ///
    /// The TCP connect and the header exchange share one deadline, the
    /// configured connect timeout.
    pub fn open(
        addr: SocketAddr,
        config: &ChannelConfig,
        metrics: Arc<AtomicMetrics>,
    ) -> TransportResult<Self> {
        config.validate()?;
        metrics.connections.fetch_add(1, Ordering::Relaxed);
        debug!("Connecting to {}", addr);

        match Self::handshake(addr, config, Arc::clone(&metrics)) {
            Ok(channel) => {
                metrics.active_connections.fetch_add(1, Ordering::Relaxed);
                debug!("Channel to {} established", addr);
                Ok(channel)
            }
            Err(e) => {
                metrics.failed_connections.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to open channel to {}: {}", addr, e);
                Err(e)
            }
        }
    }

    fn handshake(
        addr: SocketAddr,
        config: &ChannelConfig,
        metrics: Arc<AtomicMetrics>,
    ) -> TransportResult<Self> {
        let timeout = config.connect_timeout();
        let deadline = Instant::now() + timeout;
        let mut stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) {
                TransportError::ConnectionTimeout {
                    operation: format!("connect to {addr}"),
                    timeout,
                }
            } else {
                TransportError::ConnectionFailed(format!("{addr}: {e}"))
            }
        })?;
        stream.set_nodelay(config.nodelay)?;
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::ConnectionTimeout {
                operation: "stream header".into(),
                timeout,
            });
        }
        stream.set_read_timeout(Some(remaining))?;
        stream.set_write_timeout(Some(remaining))?;

        let mut writer = ObjectWriter::new();
        let mut scratch = BytesMut::with_capacity(256);
        writer.write_header(&mut scratch);
        stream.write_all(&scratch)?;
        stream.flush()?;
        metrics
            .bytes_sent
            .fetch_add(scratch.len() as u64, Ordering::Relaxed);

        let read_half = CountingStream {
            inner: stream.try_clone()?,
            metrics: Arc::clone(&metrics),
        };
        let mut reader = ObjectReader::new(BufReader::with_capacity(config.buffer_size, read_half));
        reader.read_header().map_err(|e| match e {
            CodecError::Io(ref io)
                if matches!(io.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) =>
            {
                TransportError::ConnectionTimeout {
                    operation: "stream header".into(),
                    timeout,
                }
            }
            other => TransportError::Handshake(other.to_string()),
        })?;

        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(None)?;

        Ok(Self {
            peer: addr,
            stream,
            reader,
            writer,
            scratch,
            state: TransportState::Connected,
            metrics,
        })
    }

    /// Address of the peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Current state.
    pub fn state(&self) -> &TransportState {
        &self.state
    }

    /// True while values can be exchanged.
    pub fn is_open(&self) -> bool {
        self.state == TransportState::Connected
    }

    /// Snapshot of the counters this channel reports into.
    pub fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    /// Shared counters, for recording round-trip latency.
    pub fn metrics_handle(&self) -> &Arc<AtomicMetrics> {
        &self.metrics
    }

    /// Handle that can sever this channel from another thread.
    pub fn shutdown_handle(&self) -> TransportResult<ShutdownHandle> {
        Ok(ShutdownHandle {
            stream: self.stream.try_clone()?,
        })
    }

    /// Encodes `value` and flushes it to the peer.
    pub fn send(&mut self, value: &Value) -> TransportResult<()> {
        self.ensure_open()?;
        self.scratch.clear();
        // A failed encode may have consumed handles the peer never saw
        if let Err(e) = self.writer.encode(value, &mut self.scratch) {
            return Err(self.fail(e.into()));
        }
        if let Err(e) = self
            .stream
            .write_all(&self.scratch)
            .and_then(|()| self.stream.flush())
        {
            return Err(self.fail(e.into()));
        }
        self.metrics
            .bytes_sent
            .fetch_add(self.scratch.len() as u64, Ordering::Relaxed);
        self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        trace!("Sent {} ({} bytes)", value.type_name(), self.scratch.len());
        Ok(())
    }

    /// Sends a boxed integer.
    pub fn send_int(&mut self, n: i32) -> TransportResult<()> {
        self.send(&Value::Integer(n))
    }

    /// Sends a string.
    pub fn send_str(&mut self, s: &str) -> TransportResult<()> {
        self.send(&Value::String(s.to_string()))
    }

    /// Blocks until the next value arrives.
    pub fn receive(&mut self) -> TransportResult<Value> {
        self.ensure_open()?;
        match self.reader.read_value() {
            Ok(value) => {
                self.metrics
                    .messages_received
                    .fetch_add(1, Ordering::Relaxed);
                trace!("Received {}", value.type_name());
                Ok(value)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// True when bytes beyond the last value have already arrived.
    ///
    /// Only data already buffered or sitting in the socket is seen. Values the
    /// peer sends after this check are read as the reply to a later request.
    pub fn has_pending_input(&mut self) -> bool {
        if !self.reader.get_ref().buffer().is_empty() {
            return true;
        }
        if self.stream.set_nonblocking(true).is_err() {
            return false;
        }
        let mut peeked = [0u8; 1];
        let pending = matches!(self.stream.peek(&mut peeked), Ok(n) if n > 0);
        if let Err(e) = self.stream.set_nonblocking(false) {
            warn!("Failed to restore blocking mode: {}", e);
        }
        pending
    }

    /// Closes the socket. Safe to call more than once.
    pub fn close(&mut self) {
        match self.state {
            TransportState::Disconnected | TransportState::Disconnecting => return,
            _ => {}
        }
        self.state = TransportState::Disconnecting;
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            trace!("Shutdown of {}: {}", self.peer, e);
        }
        self.metrics.channel_closed();
        self.state = TransportState::Disconnected;
        debug!("Channel to {} closed", self.peer);
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TransportError::Closed)
        }
    }

    fn fail(&mut self, err: TransportError) -> TransportError {
        debug!("Channel to {} failed: {}", self.peer, err);
        self.state = TransportState::Failed {
            reason: err.to_string(),
        };
        err
    }
}

impl Drop for ObjectChannel {
    fn drop(&mut self) {
        self.close();
    }
}
