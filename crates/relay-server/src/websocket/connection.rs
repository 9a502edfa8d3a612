//! Outbound handle for one WebSocket client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use relay_core::SessionId;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::debug;

/// The relay's handle on one WebSocket client.
///
/// Owns the sending half of the queue drained by the socket's writer task.
/// Sends never block: a full or closed queue loses the message for this
/// client only. Timestamps use the tokio clock so paused-time tests see the
/// same idle durations as the heartbeat.
pub struct ClientConnection {
    tx: mpsc::Sender<Arc<str>>,
    session_id: OnceLock<SessionId>,
    opened_at: Instant,
    last_inbound: Mutex<Instant>,
    dropped: AtomicU64,
}

impl ClientConnection {
    /// Wrap the writer queue of a freshly upgraded socket.
    pub fn new(tx: mpsc::Sender<Arc<str>>) -> Self {
        let now = Instant::now();
        Self {
            tx,
            session_id: OnceLock::new(),
            opened_at: now,
            last_inbound: Mutex::new(now),
            dropped: AtomicU64::new(0),
        }
    }

    /// Attach the session id issued by the hub. Later calls are ignored.
    pub fn bind(&self, id: SessionId) {
        let _ = self.session_id.set(id);
    }

    /// Session id, once the hub has issued one.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.get().copied()
    }

    /// Queue a text frame. Returns `false` if it was dropped.
    pub fn send(&self, payload: Arc<str>) -> bool {
        let cause = match self.tx.try_send(payload) {
            Ok(()) => return true,
            Err(TrySendError::Full(_)) => "queue_full",
            Err(TrySendError::Closed(_)) => "closed",
        };
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(session_id = ?self.session_id(), cause, dropped, "outbound message dropped");
        false
    }

    /// Messages dropped for this client so far.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Record an inbound frame of any kind.
    pub fn record_inbound(&self) {
        *self.last_inbound.lock() = Instant::now();
    }

    /// When the last inbound frame arrived (or the socket opened).
    pub fn last_inbound(&self) -> Instant {
        *self.last_inbound.lock()
    }

    /// Time since the last inbound frame.
    pub fn idle_for(&self) -> Duration {
        self.last_inbound().elapsed()
    }

    /// Time since the socket opened.
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}
