//! # relay-core
//!
//! Transport-free core of the chat relay.
//!
//! - [`ids`]: session ids and the monotonic [`IdentityRegistry`](ids::IdentityRegistry)
//! - [`topic`]: the `public` topic and per-session private topics
//! - [`protocol`]: inbound command parsing and outbound event envelopes
//! - [`presence`]: who is online, with display names
//! - [`logging`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod ids;
pub mod logging;
pub mod presence;
pub mod protocol;
pub mod topic;

pub use ids::{IdentityRegistry, SessionId};
pub use presence::{PresenceTable, SessionInfo};
pub use protocol::{ClientCommand, DropReason, ServerEvent};
pub use topic::Topic;
