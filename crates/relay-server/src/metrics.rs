//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::errors::ServerError;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Fails if a global recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Build a recorder handle without installing it globally.
///
/// Metrics recorded through the `metrics` macros are not visible to it;
/// useful where a `/metrics` route is needed but nothing global may change.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections accepted (counter).
pub const RELAY_CONNECTIONS_TOTAL: &str = "relay_connections_total";
/// WebSocket connections closed (counter, labels: reason).
pub const RELAY_DISCONNECTIONS_TOTAL: &str = "relay_disconnections_total";
/// Sessions currently in the presence table (gauge).
pub const RELAY_SESSIONS_ONLINE: &str = "relay_sessions_online";
/// Inbound commands seen (counter, labels: command).
pub const RELAY_COMMANDS_TOTAL: &str = "relay_commands_total";
/// Inbound messages ignored (counter, labels: reason).
pub const RELAY_COMMANDS_DROPPED_TOTAL: &str = "relay_commands_dropped_total";
/// Outbound messages lost to a full or closed client queue (counter).
pub const RELAY_DELIVERY_DROPS_TOTAL: &str = "relay_delivery_drops_total";
