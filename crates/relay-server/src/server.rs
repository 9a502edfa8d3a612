//! `RelayServer`: Axum HTTP + WebSocket front end for the hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::HealthResponse;
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::hub::Hub;
use crate::websocket::session::{SessionSettings, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Identity, presence and topic routing.
    pub hub: Arc<Hub>,
    /// Shutdown signal shared with every session.
    pub shutdown: ShutdownCoordinator,
    /// Per-session settings.
    pub session: SessionSettings,
    /// Max inbound WebSocket message size.
    pub max_message_size: usize,
    /// Prometheus handle for `/metrics`.
    pub metrics: PrometheusHandle,
    /// When the server started.
    pub start_time: Instant,
}

/// The chat relay server.
pub struct RelayServer {
    config: ServerConfig,
    hub: Arc<Hub>,
    shutdown: ShutdownCoordinator,
    metrics: PrometheusHandle,
    start_time: Instant,
}

impl RelayServer {
    /// Create a server with an empty hub.
    pub fn new(config: ServerConfig, metrics: PrometheusHandle) -> Self {
        Self {
            config,
            hub: Arc::new(Hub::default()),
            shutdown: ShutdownCoordinator::new(),
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    ///
    /// Every path other than `/health` and `/metrics` accepts a WebSocket
    /// upgrade.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: Arc::clone(&self.hub),
            shutdown: self.shutdown.clone(),
            session: SessionSettings::from_config(&self.config),
            max_message_size: self.config.max_message_size,
            metrics: self.metrics.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/", get(ws_handler))
            .route("/{*path}", get(ws_handler))
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown is signalled.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "relay listening");

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
            {
                warn!(error = %e, "server error");
            }
            info!("relay stopped");
        });
        Ok((addr, handle))
    }

    /// The hub.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_hub(state.start_time, &state.hub))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    metrics::render(&state.metrics)
}

/// WebSocket upgrade on any other path.
///
/// The session runs under the shutdown tracker, so a graceful shutdown waits
/// for it to leave the hub and close its socket.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let cancel = state.shutdown.session_token();
    let shutdown = state.shutdown.clone();
    ws.max_message_size(state.max_message_size)
        .max_frame_size(state.max_message_size)
        .on_upgrade(move |socket| async move {
            let session = run_ws_session(socket, state.hub, state.session, cancel);
            let _ = shutdown.track_session(session).await;
        })
        .into_response()
}
