//! Idle-connection detection.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// Nothing arrived from the client within the idle timeout.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Wait until `connection` has been silent for `timeout`.
///
/// Sleeps until the last inbound frame plus `timeout`; if a frame arrived
/// meanwhile the deadline moves forward. A silent connection therefore
/// times out `timeout` after its last frame, or after opening.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    loop {
        let deadline = connection.last_inbound() + timeout;
        tokio::select! {
            () = time::sleep_until(deadline) => {
                if connection.idle_for() >= timeout {
                    return HeartbeatResult::TimedOut;
                }
            }
            () = cancel.cancelled() => return HeartbeatResult::Cancelled,
        }
    }
}
