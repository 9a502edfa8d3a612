//! # relay-server
//!
//! Axum HTTP + `WebSocket` chat relay.
//!
//! - `WebSocket` gateway on every path: session lifecycle, heartbeat, message dispatch
//! - Hub: session ids, presence, and online/offline announcements
//! - Topic routing: one public topic plus a private topic per session
//! - HTTP endpoints: `/health` and Prometheus `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::{ServerConfig, load_config};
pub use errors::ServerError;
pub use server::RelayServer;
pub use shutdown::ShutdownCoordinator;
