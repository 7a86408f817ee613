//! Request dispatcher.
//!
//! Runs session requests off the caller's thread. Submissions go onto a FIFO
//! lane drained by one worker thread, so the server sees them in submission
//! order:
//!
//! ```text
//! caller ──submit──▶ lane (mpsc) ──▶ rtminer-io thread ──▶ Session ──▶ server
//!   ▲                                      │
//!   └──────────── Pending<T> ◀── oneshot ──┘
//! ```
//!
//! `disconnect` skips the lane so it can sever a request the worker is
//! blocked on.

use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::endpoint::Endpoint;
use crate::error::{ClientError, ClientResult};
use crate::prediction::PredictionDialog;
use crate::protocol::{LoadStatus, Turn};
use crate::session::Session;

type Job = Box<dyn FnOnce(&Arc<Session>) + Send>;

/// Result of a submitted request.
///
/// Await it from async code, or call [`Pending::blocking_wait`] from a plain
/// thread. Resolves to [`ClientError::Aborted`] if the worker goes away
/// before answering.
#[derive(Debug)]
#[must_use = "a pending request does nothing unless awaited"]
pub struct Pending<T> {
    rx: oneshot::Receiver<ClientResult<T>>,
}

impl<T> Pending<T> {
    /// Blocks the current thread until the result arrives.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_wait(self) -> ClientResult<T> {
        self.rx.blocking_recv().unwrap_or(Err(ClientError::Aborted))
    }
}

impl<T> Future for Pending<T> {
    type Output = ClientResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(ClientError::Aborted)))
    }
}

/// Serializes requests onto a dedicated I/O thread.
pub struct RequestDispatcher {
    session: Arc<Session>,
    lane: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<thread::JoinHandle<()>>,
}

// Manual Debug implementation since the job lane holds boxed closures
impl fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("session", &self.session)
            .field("running", &self.lane.is_some())
            .finish()
    }
}

impl RequestDispatcher {
    /// Starts the worker thread for `session`.
    pub fn new(session: Arc<Session>) -> ClientResult<Self> {
        let (lane, mut jobs) = mpsc::unbounded_channel::<Job>();
        let worker_session = Arc::clone(&session);
        let worker = thread::Builder::new()
            .name("rtminer-io".into())
            .spawn(move || {
                debug!("Dispatcher worker started");
                while let Some(job) = jobs.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(|| job(&worker_session))).is_err() {
                        error!("Dispatcher job panicked");
                    }
                }
                debug!("Dispatcher worker stopped");
            })
            .map_err(|e| ClientError::Io(format!("cannot start dispatcher worker: {e}")))?;
        Ok(Self {
            session,
            lane: Some(lane),
            worker: Some(worker),
        })
    }

    /// Dispatcher for the process-wide session.
    pub fn global() -> ClientResult<Self> {
        Self::new(Session::global())
    }

    /// The session requests run against.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Queues `work` behind every earlier submission.
    pub fn submit<T, F>(&self, work: F) -> Pending<T>
    where
        T: Send + 'static,
        F: FnOnce(&Arc<Session>) -> ClientResult<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |session| {
            // The caller may have stopped waiting
            let _ = tx.send(work(session));
        });
        if let Some(lane) = &self.lane {
            // A closed lane drops the job and its sender, resolving as Aborted
            let _ = lane.send(job);
        }
        Pending { rx }
    }

    /// See [`Session::connect`].
    pub fn connect(&self) -> Pending<()> {
        self.submit(|session| session.connect())
    }

    /// See [`Session::reconnect`].
    pub fn reconnect(&self) -> Pending<()> {
        self.submit(|session| session.reconnect())
    }

    /// See [`Session::disconnect`]. Runs immediately on its own thread.
    pub fn disconnect(&self) -> Pending<()> {
        let (tx, rx) = oneshot::channel();
        let session = Arc::clone(&self.session);
        let spawned = thread::Builder::new()
            .name("rtminer-disconnect".into())
            .spawn(move || {
                session.disconnect();
                let _ = tx.send(Ok(()));
            });
        if let Err(e) = spawned {
            error!("Cannot spawn disconnect thread ({}); disconnecting inline", e);
            self.session.disconnect();
        }
        Pending { rx }
    }

    /// See [`Session::set_endpoint`].
    pub fn set_endpoint(&self, host: impl Into<String>, port: u32) -> Pending<()> {
        let host = host.into();
        self.submit(move |session| session.set_endpoint(host, port))
    }

    /// Current endpoint, read without queueing.
    pub fn endpoint(&self) -> Endpoint {
        self.session.endpoint()
    }

    /// See [`Session::list_tables`].
    pub fn list_tables(&self) -> Pending<Vec<String>> {
        self.submit(|session| session.list_tables())
    }

    /// See [`Session::list_files`].
    pub fn list_files(&self) -> Pending<Vec<String>> {
        self.submit(|session| session.list_files())
    }

    /// See [`Session::learn_tree_from_table`].
    pub fn learn_tree_from_table(&self, name: impl Into<String>) -> Pending<LoadStatus> {
        let name = name.into();
        self.submit(move |session| session.learn_tree_from_table(&name))
    }

    /// See [`Session::load_tree_from_file`].
    pub fn load_tree_from_file(&self, name: impl Into<String>) -> Pending<LoadStatus> {
        let name = name.into();
        self.submit(move |session| session.load_tree_from_file(&name))
    }

    /// See [`Session::print_tree`].
    pub fn print_tree(&self) -> Pending<String> {
        self.submit(|session| session.print_tree())
    }

    /// See [`Session::begin_prediction`].
    pub fn begin_prediction(&self) -> Pending<PredictionDialog> {
        self.submit(|session| session.begin_prediction())
    }

    /// See [`PredictionDialog::choose`].
    pub fn choose(&self, dialog: &PredictionDialog, index: u32) -> Pending<Turn> {
        let dialog = dialog.clone();
        self.submit(move |_| dialog.choose(index))
    }

    /// Stops accepting work and waits for queued requests to finish.
    pub fn shutdown(mut self) {
        self.lane.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("Dispatcher worker panicked");
        }
    }
}

impl Drop for RequestDispatcher {
    fn drop(&mut self) {
        // Closing the lane lets the worker exit once the queue drains
        self.lane.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;

    fn dispatcher() -> RequestDispatcher {
        RequestDispatcher::new(Arc::new(Session::new(SessionConfig::default()))).unwrap()
    }

    #[tokio::test]
    async fn test_submissions_run_in_order() {
        let dispatcher = dispatcher();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let pending: Vec<_> = (0..20)
            .map(|i| {
                let log = Arc::clone(&log);
                dispatcher.submit(move |_| {
                    log.lock().push(i);
                    Ok(i)
                })
            })
            .collect();
        for (i, p) in pending.into_iter().enumerate() {
            assert_eq!(p.await.unwrap(), i);
        }
        assert_eq!(*log.lock(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_panicking_job_resolves_aborted() {
        let dispatcher = dispatcher();
        let failed = dispatcher.submit(|_| -> ClientResult<()> { panic!("job failure") });
        assert_eq!(failed.await, Err(ClientError::Aborted));
        // The worker survives
        assert_eq!(dispatcher.submit(|_| Ok(7)).await, Ok(7));
    }

    #[tokio::test]
    async fn test_requests_without_connection() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.list_tables().await, Err(ClientError::NotConnected));
        assert_eq!(
            dispatcher.learn_tree_from_table("").await,
            Err(ClientError::InvalidArgument("learn-tree(3) needs a non-empty name".into()))
        );
        assert!(matches!(
            dispatcher.connect().await,
            Err(ClientError::Config(_))
        ));
        assert_eq!(dispatcher.disconnect().await, Ok(()));
    }

    #[tokio::test]
    async fn test_set_endpoint_through_lane() {
        let dispatcher = dispatcher();
        dispatcher.set_endpoint("127.0.0.1", 50000).await.unwrap();
        assert_eq!(dispatcher.endpoint(), Endpoint::new("127.0.0.1", 50000));
    }

    #[test]
    fn test_blocking_wait_outside_runtime() {
        let dispatcher = dispatcher();
        assert_eq!(dispatcher.submit(|_| Ok("done")).blocking_wait(), Ok("done"));
        dispatcher.shutdown();
    }
}
