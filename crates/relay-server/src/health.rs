//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

use crate::websocket::hub::Hub;

/// Liveness summary read straight from the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// `"ok"` while the listener is up.
    pub status: &'static str,
    /// Crate version of the running relay.
    pub version: &'static str,
    /// Whole seconds since the server was created.
    pub uptime_secs: u64,
    /// Sessions in the presence table.
    pub online_sessions: usize,
    /// Topics with at least one subscriber: `public` plus one per session.
    pub topics: usize,
}

impl HealthResponse {
    /// Snapshot `hub` for a server started at `started`.
    pub fn from_hub(started: Instant, hub: &Hub) -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: started.elapsed().as_secs(),
            online_sessions: hub.online_count(),
            topics: hub.router().topic_count(),
        }
    }
}
