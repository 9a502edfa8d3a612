//! WebSocket connection management, heartbeat, message dispatch, and topic routing.

pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod hub;
pub mod router;
pub mod session;
