//! The process-wide session that owns the server connection.
//!
//! Every wire exchange runs while holding the session mutex, so requests
//! reach the server in the order they acquired it and each reply is fully
//! consumed before the next request is written. `disconnect` never waits for
//! an exchange: it severs the socket first, which unblocks the holder of the
//! mutex with an error that the holder reports as [`ClientError::Aborted`].

mod config;
mod state;

#[cfg(test)]
mod tests;

pub use config::SessionConfig;
pub use state::SessionState;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard, RwLock};
use rtminer_transport::{
    AtomicMetrics, ChannelBuilder, ObjectChannel, ShutdownHandle, TransportMetrics,
};
use tracing::{debug, info, warn};

use crate::endpoint::{Endpoint, EndpointCheck};
use crate::error::{ClientError, ClientResult};
use crate::network::{NetworkProbe, RouteProbe};
use crate::prediction::PredictionDialog;
use crate::protocol::{Catalogue, LoadStatus, RequestCode, Turn, read_turn};

static GLOBAL: Lazy<Arc<Session>> = Lazy::new(|| Arc::new(Session::new(SessionConfig::default())));

/// State guarded by the session mutex.
#[derive(Debug)]
struct Inner {
    channel: Option<ObjectChannel>,
    /// Lease id of the prediction dialog holding the channel
    lease: Option<u64>,
    tree_ready: bool,
}

/// Owner of the single server connection.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    inner: Mutex<Inner>,
    /// Read without the session mutex, written only while holding it
    endpoint: RwLock<Endpoint>,
    status: Mutex<SessionState>,
    connected: AtomicBool,
    /// Bumped by every disconnect so in-flight work can tell it was cancelled
    epoch: AtomicU64,
    severer: Mutex<Option<ShutdownHandle>>,
    probe: RwLock<Arc<dyn NetworkProbe>>,
    metrics: Arc<AtomicMetrics>,
    next_lease: AtomicU64,
}

impl Session {
    /// The process-wide session.
    pub fn global() -> Arc<Session> {
        Arc::clone(&GLOBAL)
    }

    /// A session independent of [`Session::global`].
    ///
    /// The server serves one client at a time, so an application normally
    /// uses the global session; separate sessions suit tests and tools that
    /// talk to several servers.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                channel: None,
                lease: None,
                tree_ready: false,
            }),
            endpoint: RwLock::new(Endpoint::default()),
            status: Mutex::new(SessionState::Disconnected),
            connected: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            severer: Mutex::new(None),
            probe: RwLock::new(Arc::new(RouteProbe)),
            metrics: Arc::new(AtomicMetrics::new()),
            next_lease: AtomicU64::new(1),
        }
    }

    /// Settings this session was created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ============================================================================
    // ENDPOINT
    // ============================================================================

    /// Copy of the configured endpoint.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.read().clone()
    }

    /// Configured host.
    pub fn host(&self) -> String {
        self.endpoint.read().host().to_string()
    }

    /// Configured port.
    pub fn port(&self) -> u32 {
        self.endpoint.read().port()
    }

    /// Validates the configured endpoint.
    pub fn check_endpoint(&self) -> EndpointCheck {
        self.endpoint.read().check()
    }

    /// Sets the host. Fails while connected.
    pub fn set_host(&self, host: impl Into<String>) -> ClientResult<()> {
        let host = host.into();
        self.update_endpoint(|endpoint| endpoint.set_host(host))
    }

    /// Sets the port. Fails while connected.
    pub fn set_port(&self, port: u32) -> ClientResult<()> {
        self.update_endpoint(|endpoint| endpoint.set_port(port))
    }

    /// Sets host and port together. Fails while connected.
    pub fn set_endpoint(&self, host: impl Into<String>, port: u32) -> ClientResult<()> {
        let next = Endpoint::new(host, port);
        self.update_endpoint(|endpoint| *endpoint = next)
    }

    fn update_endpoint(&self, apply: impl FnOnce(&mut Endpoint)) -> ClientResult<()> {
        if self.is_connected() {
            return Err(ClientError::Config(
                "endpoint cannot change while connected".into(),
            ));
        }
        let inner = self.inner.lock();
        if inner.channel.is_some() {
            return Err(ClientError::Config(
                "endpoint cannot change while connected".into(),
            ));
        }
        apply(&mut self.endpoint.write());
        Ok(())
    }

    /// Replaces the network availability probe.
    pub fn set_probe(&self, probe: Arc<dyn NetworkProbe>) {
        *self.probe.write() = probe;
    }

    // ============================================================================
    // LIFECYCLE
    // ============================================================================

    /// Current lifecycle state. Never waits for the session mutex.
    pub fn state(&self) -> SessionState {
        *self.status.lock()
    }

    /// Advisory connection flag. Never waits for the session mutex.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// True when the last learn/load on this connection returned `ok`.
    pub fn has_tree(&self) -> bool {
        self.inner.lock().tree_ready
    }

    /// Snapshot of channel counters across every connection of this session.
    pub fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn set_state(&self, state: SessionState) {
        let mut status = self.status.lock();
        if *status != state {
            debug!("Session state {} -> {}", *status, state);
            *status = state;
        }
    }

    /// Opens the channel to the configured endpoint.
    ///
    /// Checks run in order: endpoint validation, network probe, then the TCP
    /// connect and header exchange under the configured timeout. Does nothing
    /// when already connected.
    pub fn connect(&self) -> ClientResult<()> {
        let mut inner = self.inner.lock();
        if inner.channel.is_some() {
            debug!("Connect ignored: already connected");
            return Ok(());
        }

        let addr = self.endpoint.read().socket_addr()?;
        if !self.probe.read().is_available(addr) {
            warn!("No network route to {}", addr);
            return Err(ClientError::NoNetwork(addr.to_string()));
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.set_state(SessionState::Connecting);
        info!("Connecting to {}", addr);

        let opened = ChannelBuilder::with_config(self.config.channel_config())
            .metrics(Arc::clone(&self.metrics))
            .open(SocketAddr::V4(addr))
            .and_then(|channel| channel.shutdown_handle().map(|handle| (channel, handle)));
        let (channel, severer) = match opened {
            Ok(pair) => pair,
            Err(e) => {
                self.set_state(SessionState::Disconnected);
                warn!("Connect to {} failed: {}", addr, e);
                return Err(ClientError::Connect(e.to_string()));
            }
        };

        if self.epoch.load(Ordering::SeqCst) != epoch {
            drop(channel);
            self.set_state(SessionState::Disconnected);
            info!("Connect to {} cancelled by disconnect", addr);
            return Err(ClientError::Aborted);
        }

        *self.severer.lock() = Some(severer);
        inner.channel = Some(channel);
        inner.lease = None;
        inner.tree_ready = false;
        self.connected.store(true, Ordering::SeqCst);
        self.set_state(SessionState::Idle);
        info!("Connected to {}", addr);
        Ok(())
    }

    /// Closes the channel, aborting whatever is in flight. Idempotent.
    pub fn disconnect(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let severer = self.severer.lock().take();
        if let Some(severer) = severer {
            self.set_state(SessionState::Disconnecting);
            severer.sever();
        }
        let mut inner = self.inner.lock();
        self.teardown(&mut inner);
    }

    /// Disconnects, then connects again to the configured endpoint.
    pub fn reconnect(&self) -> ClientResult<()> {
        self.disconnect();
        self.connect()
    }

    fn teardown(&self, inner: &mut Inner) {
        self.severer.lock().take();
        if let Some(mut channel) = inner.channel.take() {
            channel.close();
            info!("Disconnected from {}", channel.peer_addr());
        }
        inner.lease = None;
        inner.tree_ready = false;
        self.connected.store(false, Ordering::SeqCst);
        self.set_state(SessionState::Disconnected);
    }

    // ============================================================================
    // REQUESTS
    // ============================================================================

    /// Lists database tables. A lone `NoTablesFound` is returned as-is.
    pub fn list_tables(&self) -> ClientResult<Vec<String>> {
        self.list(Catalogue::Tables)
    }

    /// Lists archived tree files. A lone `NoFilesFound` is returned as-is.
    pub fn list_files(&self) -> ClientResult<Vec<String>> {
        self.list(Catalogue::Files)
    }

    /// Lists one catalogue.
    pub fn list(&self, catalogue: Catalogue) -> ClientResult<Vec<String>> {
        let (names, _guard) = self.request(catalogue.request(), None, |channel| {
            Ok(channel.receive()?.into_string_list()?)
        })?;
        Ok(names)
    }

    /// Asks the server to learn a tree from table `name`.
    pub fn learn_tree_from_table(&self, name: &str) -> ClientResult<LoadStatus> {
        self.load(RequestCode::LearnTree, name, LoadStatus::parse_learn)
    }

    /// Asks the server to load the tree stored in file `name`.
    pub fn load_tree_from_file(&self, name: &str) -> ClientResult<LoadStatus> {
        self.load(RequestCode::LoadTree, name, LoadStatus::parse_load)
    }

    fn load(
        &self,
        code: RequestCode,
        name: &str,
        parse: fn(&str) -> ClientResult<LoadStatus>,
    ) -> ClientResult<LoadStatus> {
        if name.is_empty() {
            return Err(ClientError::InvalidArgument(format!(
                "{code} needs a non-empty name"
            )));
        }
        let (status, mut inner) = self.request(code, Some(name), |channel| {
            parse(&channel.receive()?.into_string()?)
        })?;
        inner.tree_ready = status.is_ok();
        debug!("{} {:?}: {}", code, name, status);
        Ok(status)
    }

    /// Textual form of the current tree, exactly as the server sent it.
    pub fn print_tree(&self) -> ClientResult<String> {
        let (text, _guard) = self.request(RequestCode::PrintTree, None, |channel| {
            Ok(channel.receive()?.into_string()?)
        })?;
        Ok(text)
    }

    /// Starts an interactive prediction on the loaded tree.
    ///
    /// When the server asks a question, the returned dialog holds the
    /// channel lease until it reaches a prediction, is dropped, or the
    /// session disconnects. Other requests fail with [`ClientError::Busy`]
    /// meanwhile.
    pub fn begin_prediction(self: &Arc<Self>) -> ClientResult<PredictionDialog> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut inner = self.inner.lock();
        self.ensure_idle(&inner)?;
        if !inner.tree_ready {
            return Err(ClientError::NoTreeLoaded);
        }

        let turn = self.run(&mut inner, epoch, |channel| {
            exchange(channel, RequestCode::Predict, None, read_turn)
        })?;
        let lease = match &turn {
            Turn::Query { .. } => {
                let id = self.next_lease.fetch_add(1, Ordering::Relaxed);
                inner.lease = Some(id);
                self.set_state(SessionState::Predicting);
                debug!("Prediction lease {} granted", id);
                Some(id)
            }
            Turn::Done(_) => None,
        };
        drop(inner);
        Ok(PredictionDialog::new(Arc::clone(self), lease, turn))
    }

    /// Sends the chosen child index for the dialog holding `lease`.
    pub(crate) fn advance(&self, lease: u64, index: u32) -> ClientResult<Turn> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut inner = self.inner.lock();
        if inner.lease != Some(lease) || self.severer.lock().is_none() {
            return Err(ClientError::Aborted);
        }

        let index = i32::try_from(index)
            .map_err(|_| ClientError::InvalidArgument(format!("index {index} too large")))?;
        let turn = self.run(&mut inner, epoch, |channel| {
            channel.send_int(index)?;
            let turn = read_turn(channel)?;
            ensure_drained(channel)?;
            Ok(turn)
        })?;
        if turn.is_done() {
            inner.lease = None;
            self.set_state(SessionState::Idle);
            debug!("Prediction lease {} released", lease);
        }
        Ok(turn)
    }

    /// Gives up the channel held by an unfinished dialog.
    ///
    /// The server is waiting for an index that will never come, so the
    /// stream cannot be resynchronised; the connection is torn down.
    pub(crate) fn abandon(&self, lease: u64) {
        let mut inner = self.inner.lock();
        if inner.lease == Some(lease) {
            warn!("Prediction lease {} abandoned; closing connection", lease);
            self.teardown(&mut inner);
        }
    }

    fn ensure_idle(&self, inner: &Inner) -> ClientResult<()> {
        if inner.channel.is_none() {
            return Err(ClientError::NotConnected);
        }
        if inner.lease.is_some() {
            return Err(ClientError::Busy);
        }
        // A disconnect has already severed the socket and is waiting for the mutex
        if self.severer.lock().is_none() {
            return Err(ClientError::Aborted);
        }
        Ok(())
    }

    /// Runs one request/reply exchange and hands back the still-held mutex.
    fn request<T>(
        &self,
        code: RequestCode,
        arg: Option<&str>,
        read: impl FnOnce(&mut ObjectChannel) -> ClientResult<T>,
    ) -> ClientResult<(T, MutexGuard<'_, Inner>)> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let mut inner = self.inner.lock();
        self.ensure_idle(&inner)?;
        let value = self.run(&mut inner, epoch, |channel| exchange(channel, code, arg, read))?;
        Ok((value, inner))
    }

    fn run<T>(
        &self,
        inner: &mut Inner,
        epoch: u64,
        op: impl FnOnce(&mut ObjectChannel) -> ClientResult<T>,
    ) -> ClientResult<T> {
        let Some(channel) = inner.channel.as_mut() else {
            return Err(ClientError::NotConnected);
        };
        self.set_state(SessionState::Busy);
        let started = Instant::now();
        let result = op(channel);

        match result {
            Ok(value) => {
                let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
                self.metrics.update_latency_us(elapsed);
                self.settle_idle(inner);
                Ok(value)
            }
            Err(e) if self.epoch.load(Ordering::SeqCst) != epoch => {
                info!("Request aborted by disconnect ({})", e);
                self.teardown(inner);
                Err(ClientError::Aborted)
            }
            Err(e) if e.is_fatal() => {
                warn!("Closing connection after failure: {}", e);
                self.teardown(inner);
                Err(e)
            }
            Err(e) => {
                self.settle_idle(inner);
                Err(e)
            }
        }
    }

    fn settle_idle(&self, inner: &Inner) {
        self.set_state(if inner.lease.is_some() {
            SessionState::Predicting
        } else {
            SessionState::Idle
        });
    }
}

/// Writes the request code and optional argument, then reads the reply.
fn exchange<T>(
    channel: &mut ObjectChannel,
    code: RequestCode,
    arg: Option<&str>,
    read: impl FnOnce(&mut ObjectChannel) -> ClientResult<T>,
) -> ClientResult<T> {
    debug!("Request {}", code);
    channel.send_int(code.code())?;
    if let Some(arg) = arg {
        channel.send_str(arg)?;
    }
    let value = read(channel)?;
    ensure_drained(channel)?;
    Ok(value)
}

/// Fails when the server wrote more values than the reply holds.
fn ensure_drained(channel: &mut ObjectChannel) -> ClientResult<()> {
    if channel.has_pending_input() {
        Err(ClientError::protocol(
            "server sent more values than the reply holds",
        ))
    } else {
        Ok(())
    }
}
