//! Session lifecycle: connect, rename, disconnect.
//!
//! The [`Hub`] owns the identity registry and the presence table behind one
//! lock and drives the [`TopicRouter`]. Each lifecycle operation runs as a
//! single critical section on that lock, so concurrent connects are
//! linearized: no two connects see the same id, and a newcomer's presence
//! snapshot never observes a half-finished connect.
//!
//! Lock order is always hub state, then router. The router never calls back
//! into the hub and its sends never await, so publishing while holding the
//! hub lock cannot deadlock.

use std::sync::Arc;

use metrics::gauge;
use parking_lot::Mutex;
use relay_core::{IdentityRegistry, PresenceTable, ServerEvent, SessionId, SessionInfo, Topic};
use tracing::{debug, info};

use super::connection::ClientConnection;
use super::router::TopicRouter;
use crate::metrics::RELAY_SESSIONS_ONLINE;

/// Mutable state shared by every connection.
#[derive(Debug, Default)]
struct HubState {
    identity: IdentityRegistry,
    presence: PresenceTable,
}

/// Session lifecycle controller.
pub struct Hub {
    state: Mutex<HubState>,
    router: Arc<TopicRouter>,
}

impl Hub {
    /// Hub issuing ids from the default seed.
    pub fn new(router: Arc<TopicRouter>) -> Self {
        Self::with_identity(router, IdentityRegistry::new())
    }

    /// Hub with a caller-supplied id registry.
    pub fn with_identity(router: Arc<TopicRouter>, identity: IdentityRegistry) -> Self {
        Self {
            state: Mutex::new(HubState {
                identity,
                presence: PresenceTable::new(),
            }),
            router,
        }
    }

    /// Bring a new connection online.
    ///
    /// In order: allocate an id, subscribe to `public` and the session's
    /// private topic, announce the session on `public`, tell the newcomer
    /// (directly) about every peer already online, then insert the session
    /// into the presence table. The snapshot is taken before the insert, so
    /// the newcomer never sees itself in its own peer listing. It does see
    /// its own `public` announcement, being subscribed by then.
    pub fn connect(&self, connection: &Arc<ClientConnection>) -> SessionId {
        let mut state = self.state.lock();

        let id = state.identity.next_id();
        connection.bind(id);
        let info = SessionInfo::new(id);

        self.router.subscribe(Topic::Public, id, Arc::clone(connection));
        self.router.subscribe(Topic::private(id), id, Arc::clone(connection));

        let recipients = self
            .router
            .publish_event(&Topic::Public, &ServerEvent::status(&info, true));

        let peers = state.presence.snapshot();
        for peer in &peers {
            let _ = self
                .router
                .send_direct(connection, &ServerEvent::status(peer, true));
        }

        let _ = state.presence.insert(info);
        gauge!(RELAY_SESSIONS_ONLINE).set(state.presence.len() as f64);

        info!(session_id = %id, peers = peers.len(), recipients, "session online");
        id
    }

    /// Take a session offline.
    ///
    /// Unsubscribes the connection, removes the presence entry, then
    /// announces `online: false` with the metadata captured at removal.
    /// Returns `None` (and announces nothing) if the session is already gone.
    pub fn disconnect(&self, id: SessionId) -> Option<SessionInfo> {
        let mut state = self.state.lock();

        let _ = self.router.unsubscribe_all(id);
        let Some(info) = state.presence.remove(id) else {
            debug!(session_id = %id, "disconnect for unknown session");
            return None;
        };
        gauge!(RELAY_SESSIONS_ONLINE).set(state.presence.len() as f64);

        let recipients = self
            .router
            .publish_event(&Topic::Public, &ServerEvent::status(&info, false));

        info!(session_id = %id, name = %info.name, recipients, "session offline");
        Some(info)
    }

    /// Change a session's display name and re-announce it on `public`.
    ///
    /// Returns `false` if the session is not online.
    pub fn rename(&self, id: SessionId, name: String) -> bool {
        let mut state = self.state.lock();

        let Some(previous) = state.presence.rename(id, name) else {
            debug!(session_id = %id, "rename for unknown session");
            return false;
        };
        let Some(info) = state.presence.get(id) else {
            return false;
        };

        let recipients = self
            .router
            .publish_event(&Topic::Public, &ServerEvent::status(info, true));

        info!(
            session_id = %id,
            previous = %previous,
            name = %info.name,
            recipients,
            "session renamed"
        );
        true
    }

    /// Snapshot of every online session.
    pub fn online(&self) -> Vec<SessionInfo> {
        self.state.lock().presence.snapshot()
    }

    /// Whether `id` has a presence entry.
    pub fn is_online(&self, id: SessionId) -> bool {
        self.state.lock().presence.contains(id)
    }

    /// Number of online sessions.
    pub fn online_count(&self) -> usize {
        self.state.lock().presence.len()
    }

    /// Current metadata of one session.
    pub fn session(&self, id: SessionId) -> Option<SessionInfo> {
        self.state.lock().presence.get(id).cloned()
    }

    /// The topic router this hub publishes through.
    pub fn router(&self) -> &Arc<TopicRouter> {
        &self.router
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(Arc::new(TopicRouter::new()))
    }
}
