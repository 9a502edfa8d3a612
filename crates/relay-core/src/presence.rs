//! Presence table: who is online and under which name.

use std::collections::HashMap;

use crate::ids::SessionId;

/// Display name every session starts with.
pub const DEFAULT_NAME: &str = "noname";

/// Per-session metadata owned by the relay core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    /// Session id.
    pub id: SessionId,
    /// Display name, changed only by the session's own `set_name`.
    pub name: String,
}

impl SessionInfo {
    /// Fresh metadata with the default name.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            name: DEFAULT_NAME.to_owned(),
        }
    }
}

/// In-memory map of online sessions.
///
/// Not synchronized; the owner serializes access.
#[derive(Debug, Default)]
pub struct PresenceTable {
    entries: HashMap<SessionId, SessionInfo>,
}

impl PresenceTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `info.id`, returning the replaced entry.
    pub fn insert(&mut self, info: SessionInfo) -> Option<SessionInfo> {
        self.entries.insert(info.id, info)
    }

    /// Remove `id`, returning its metadata as it was at removal time.
    /// Removing an absent id is a no-op.
    pub fn remove(&mut self, id: SessionId) -> Option<SessionInfo> {
        self.entries.remove(&id)
    }

    /// Look up one session.
    pub fn get(&self, id: SessionId) -> Option<&SessionInfo> {
        self.entries.get(&id)
    }

    /// Update the display name in place, returning the previous name.
    pub fn rename(&mut self, id: SessionId, name: String) -> Option<String> {
        self.entries
            .get_mut(&id)
            .map(|info| std::mem::replace(&mut info.name, name))
    }

    /// Whether `id` is online.
    pub fn contains(&self, id: SessionId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Point-in-time copy of every entry, ordered by id.
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let mut all: Vec<SessionInfo> = self.entries.values().cloned().collect();
        all.sort_by_key(|info| info.id);
        all
    }

    /// Number of online sessions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is online.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
