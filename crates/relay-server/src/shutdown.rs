//! Graceful shutdown: one `CancellationToken` observed by the listener and
//! by every WebSocket session, plus a tracker of the sessions themselves.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tokio_util::task::task_tracker::TrackedFuture;
use tracing::{info, warn};

/// How long to wait for the listener and sessions to wind down.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared shutdown signal for the relay.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    sessions: TaskTracker,
}

impl ShutdownCoordinator {
    /// Create a coordinator that has not fired.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            sessions: TaskTracker::new(),
        }
    }

    /// The root token. Cancelling it stops the listener.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// A token for one session; fires with the root, but can also be
    /// cancelled on its own when the session ends.
    pub fn session_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Wrap a session future so shutdown waits for it to finish.
    pub fn track_session<F: Future>(&self, session: F) -> TrackedFuture<F> {
        self.sessions.track_future(session)
    }

    /// Sessions still running.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown was signalled.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Signal shutdown and wait up to `timeout` for `handles` and every
    /// tracked session to finish.
    ///
    /// Returns `false` if the wait timed out; the tasks are left running.
    pub async fn graceful_shutdown(
        &self,
        handles: Vec<JoinHandle<()>>,
        timeout: Option<Duration>,
    ) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        self.shutdown();
        self.sessions.close();
        info!(
            task_count = handles.len(),
            sessions = self.sessions.len(),
            timeout_secs = timeout.as_secs(),
            "shutting down relay"
        );

        let sessions = self.sessions.clone();
        let drain = async move {
            let _ = futures::future::join_all(handles).await;
            sessions.wait().await;
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("shutdown timed out after {timeout:?}");
            return false;
        }
        true
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_coordinator_not_shutting_down() {
        let coord = ShutdownCoordinator::default();
        assert!(!coord.is_shutting_down());
        assert!(!coord.token().is_cancelled());
    }

    #[test]
    fn shutdown_cancels_root_and_sessions() {
        let coord = ShutdownCoordinator::new();
        let root = coord.token();
        let s1 = coord.session_token();
        let s2 = coord.session_token();
        coord.shutdown();
        coord.shutdown();
        assert!(root.is_cancelled());
        assert!(s1.is_cancelled());
        assert!(s2.is_cancelled());
    }

    #[test]
    fn session_token_cancel_is_local() {
        let coord = ShutdownCoordinator::new();
        let s1 = coord.session_token();
        let s2 = coord.session_token();
        s1.cancel();
        assert!(!s2.is_cancelled());
        assert!(!coord.is_shutting_down());
    }

    #[test]
    fn clones_share_signal() {
        let coord = ShutdownCoordinator::new();
        let other = coord.clone();
        other.shutdown();
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn graceful_shutdown_awaits_tasks() {
        let coord = ShutdownCoordinator::new();
        let token = coord.session_token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
        });
        assert!(coord.graceful_shutdown(vec![handle], None).await);
    }

    #[tokio::test]
    async fn graceful_shutdown_waits_for_tracked_sessions() {
        let coord = ShutdownCoordinator::new();
        let token = coord.session_token();
        let (done_tx, mut done_rx) = tokio::sync::oneshot::channel();
        let _ = tokio::spawn(coord.track_session(async move {
            token.cancelled().await;
            // Cleanup after the signal still has to complete
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = done_tx.send(());
        }));
        assert_eq!(coord.active_sessions(), 1);

        assert!(coord.graceful_shutdown(Vec::new(), None).await);
        assert!(done_rx.try_recv().is_ok());
        assert_eq!(coord.active_sessions(), 0);
    }

    #[tokio::test]
    async fn graceful_shutdown_times_out() {
        let coord = ShutdownCoordinator::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(300)).await;
        });
        let finished = coord
            .graceful_shutdown(vec![handle], Some(Duration::from_millis(50)))
            .await;
        assert!(!finished);
        assert!(coord.is_shutting_down());
    }
}
