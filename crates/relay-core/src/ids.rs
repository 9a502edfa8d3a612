//! Session ids and the registry that hands them out.
//!
//! Ids are plain integers on the wire (`user_from`, `user_id`, `user_to`),
//! so [`SessionId`] wraps a `u64` and serializes transparently.

use std::fmt;

use serde::{Deserialize, Serialize};

/// First id issued by a fresh [`IdentityRegistry`].
pub const FIRST_SESSION_ID: u64 = 10;

/// Identifier of one connected client, unique for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Monotonic id allocator.
///
/// Not synchronized: `next_id` takes `&mut self`, so whoever shares the
/// registry must put it behind a lock. The counter never resets and ids are
/// never reused.
#[derive(Debug)]
pub struct IdentityRegistry {
    next: u64,
}

impl IdentityRegistry {
    /// Registry starting at [`FIRST_SESSION_ID`].
    pub fn new() -> Self {
        Self::with_seed(FIRST_SESSION_ID)
    }

    /// Registry whose first issued id is `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self { next: seed }
    }

    /// Issue a fresh id, strictly greater than every id issued before.
    pub fn next_id(&mut self) -> SessionId {
        let id = SessionId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
