//! Broadcast topics.

use std::fmt;

use crate::ids::SessionId;

/// Name of the topic every session joins.
pub const PUBLIC_TOPIC: &str = "public";

/// Prefix of per-session private topics (`user<id>`).
pub const PRIVATE_TOPIC_PREFIX: &str = "user";

/// A named broadcast channel.
///
/// There is exactly one [`Topic::Public`]; each session additionally owns
/// the private topic named after its id, which is how directed messages are
/// delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// The global topic all sessions subscribe to.
    Public,
    /// The private topic of one session.
    User(SessionId),
}

impl Topic {
    /// Private topic of `id`.
    pub fn private(id: SessionId) -> Self {
        Self::User(id)
    }

    /// Wire name of the topic (`"public"` or `"user<id>"`).
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str(PUBLIC_TOPIC),
            Self::User(id) => write!(f, "{PRIVATE_TOPIC_PREFIX}{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_name() {
        assert_eq!(Topic::Public.name(), "public");
    }

    #[test]
    fn private_name_embeds_id() {
        assert_eq!(Topic::private(SessionId::new(10)).name(), "user10");
        assert_eq!(Topic::private(SessionId::new(123)).to_string(), "user123");
    }

    #[test]
    fn private_topics_are_distinct_per_session() {
        let a = Topic::private(SessionId::new(10));
        let b = Topic::private(SessionId::new(11));
        assert_ne!(a, b);
        assert_ne!(a, Topic::Public);
        assert_eq!(a, Topic::User(SessionId::new(10)));
    }
}
