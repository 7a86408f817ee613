//! Interactive prediction dialog.
//!
//! A dialog walks the server's tree one question at a time. While it waits
//! for the caller's answer it holds the session's channel lease: the session
//! mutex is free, so `disconnect` is never blocked, but no other request can
//! use the channel.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::protocol::Turn;
use crate::session::Session;

#[derive(Debug)]
struct DialogInner {
    session: Arc<Session>,
    lease: Option<u64>,
    turn: Mutex<Turn>,
}

impl Drop for DialogInner {
    fn drop(&mut self) {
        if let Some(lease) = self.lease
            && !self.turn.get_mut().is_done()
        {
            self.session.abandon(lease);
        }
    }
}

/// Handle to a running prediction. Clones share the same dialog.
///
/// Dropping the last clone before the dialog reaches a prediction closes the
/// connection.
#[derive(Debug, Clone)]
pub struct PredictionDialog {
    inner: Arc<DialogInner>,
}

impl PredictionDialog {
    pub(crate) fn new(session: Arc<Session>, lease: Option<u64>, turn: Turn) -> Self {
        Self {
            inner: Arc::new(DialogInner {
                session,
                lease,
                turn: Mutex::new(turn),
            }),
        }
    }

    /// The current question or the final prediction.
    pub fn turn(&self) -> Turn {
        self.inner.turn.lock().clone()
    }

    /// True once the server has sent its prediction.
    pub fn is_done(&self) -> bool {
        self.inner.turn.lock().is_done()
    }

    /// The predicted class, once known.
    pub fn prediction(&self) -> Option<String> {
        match &*self.inner.turn.lock() {
            Turn::Done(class) => Some(class.clone()),
            Turn::Query { .. } => None,
        }
    }

    /// Answers the current question with child `index` and returns the next turn.
    ///
    /// An index outside `[0, children)` is rejected locally with
    /// [`ClientError::InvalidChoice`] and the dialog stays on the same question.
    pub fn choose(&self, index: u32) -> ClientResult<Turn> {
        let mut turn = self.inner.turn.lock();
        let children = match &*turn {
            Turn::Query { children, .. } => *children,
            Turn::Done(_) => 0,
        };
        if index >= children {
            return Err(ClientError::InvalidChoice { index, children });
        }
        let Some(lease) = self.inner.lease else {
            return Err(ClientError::Aborted);
        };

        debug!("Prediction choice {} of {}", index, children);
        let next = self.inner.session.advance(lease, index)?;
        *turn = next.clone();
        Ok(next)
    }
}
