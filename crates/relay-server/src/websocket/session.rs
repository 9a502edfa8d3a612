//! WebSocket session lifecycle: one connected client from upgrade through
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::connection::ClientConnection;
use super::handler::handle_message;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use super::hub::Hub;
use crate::config::ServerConfig;
use crate::metrics::{RELAY_CONNECTIONS_TOTAL, RELAY_DISCONNECTIONS_TOTAL};

/// How long the writer gets to flush a close frame once the session ends.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-session knobs taken from [`ServerConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Close the connection after this long without inbound frames.
    pub idle_timeout: Duration,
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// Outbound queue capacity.
    pub send_queue_capacity: usize,
}

impl SessionSettings {
    /// Derive session settings from the server config.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout().max(Duration::from_secs(1)),
            ping_interval: config.ping_interval(),
            send_queue_capacity: config.send_queue_capacity.max(1),
        }
    }
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// Close frame or end of stream from the client.
    ClientClosed,
    /// Transport error while reading.
    Error,
    /// No inbound frames within the idle timeout.
    IdleTimeout,
    /// The server is shutting down.
    Shutdown,
}

impl CloseReason {
    /// Label for metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::Error => "error",
            Self::IdleTimeout => "idle_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Joins the hub, which assigns the session id and announces presence
/// 2. Forwards queued outbound messages and periodic pings to the socket
/// 3. Dispatches inbound text (or UTF-8 binary) frames
/// 4. Ends on close, transport error, idle timeout, or `cancel`
/// 5. Leaves the hub exactly once, which announces the departure
#[instrument(skip_all, fields(session_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    hub: Arc<Hub>,
    settings: SessionSettings,
    cancel: CancellationToken,
) -> CloseReason {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<str>>(settings.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(send_tx));

    let session_id = hub.connect(&connection);
    let _ = tracing::Span::current().record("session_id", tracing::field::display(session_id));
    counter!(RELAY_CONNECTIONS_TOTAL).increment(1);
    info!("client connected");

    // Outbound forwarder with periodic pings; sends a close frame when stopped.
    // Stopped only after the hub has let the session go, so the client never
    // sees the close before its departure is announced.
    let writer_cancel = CancellationToken::new();
    let writer_stop = writer_cancel.clone();
    let ping_interval = settings.ping_interval;
    let mut writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::from(&*text).into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                () = writer_stop.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    let mut heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&connection),
        settings.idle_timeout,
        cancel.child_token(),
    ));

    let reason = loop {
        tokio::select! {
            () = cancel.cancelled() => break CloseReason::Shutdown,
            result = &mut heartbeat => {
                break match result {
                    Ok(HeartbeatResult::TimedOut) => {
                        info!(
                            idle_secs = connection.idle_for().as_secs(),
                            "closing idle connection"
                        );
                        CloseReason::IdleTimeout
                    }
                    _ => CloseReason::Shutdown,
                };
            }
            frame = ws_rx.next() => {
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket read failed");
                        break CloseReason::Error;
                    }
                    None => break CloseReason::ClientClosed,
                };
                connection.record_inbound();

                match msg {
                    Message::Text(t) => {
                        let _ = handle_message(t.as_str(), session_id, &hub);
                    }
                    Message::Binary(data) => match std::str::from_utf8(&data) {
                        Ok(text) => {
                            let _ = handle_message(text, session_id, &hub);
                        }
                        Err(_) => debug!(len = data.len(), "ignoring non-UTF-8 binary frame"),
                    },
                    Message::Close(_) => break CloseReason::ClientClosed,
                    Message::Ping(_) | Message::Pong(_) => {}
                }
            }
        }
    };

    let _ = hub.disconnect(session_id);
    counter!(RELAY_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    info!(
        reason = reason.as_str(),
        connected_secs = connection.age().as_secs(),
        dropped = connection.dropped_count(),
        "client disconnected"
    );

    writer_cancel.cancel();
    heartbeat.abort();
    if tokio::time::timeout(WRITER_FLUSH_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    reason
}
