//! Topic fan-out to connected WebSocket clients.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use parking_lot::RwLock;
use relay_core::{ServerEvent, SessionId, Topic};
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::metrics::RELAY_DELIVERY_DROPS_TOTAL;

/// Subscribers of one topic, keyed by session.
type Subscribers = HashMap<SessionId, Arc<ClientConnection>>;

/// Publish/subscribe over live connections.
///
/// Delivery is fire-and-forget: a publish is attempted once for every
/// subscriber present at call time, and a topic with no subscribers
/// swallows the message.
pub struct TopicRouter {
    topics: RwLock<HashMap<Topic, Subscribers>>,
}

impl TopicRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe a session's connection to `topic`.
    pub fn subscribe(&self, topic: Topic, session_id: SessionId, connection: Arc<ClientConnection>) {
        let mut topics = self.topics.write();
        let _ = topics
            .entry(topic)
            .or_default()
            .insert(session_id, connection);
        debug!(%topic, %session_id, "subscribed");
    }

    /// Drop every subscription held by `session_id`. Empty topics are removed.
    pub fn unsubscribe_all(&self, session_id: SessionId) -> usize {
        let mut topics = self.topics.write();
        let mut removed = 0;
        topics.retain(|_, subscribers| {
            if subscribers.remove(&session_id).is_some() {
                removed += 1;
            }
            !subscribers.is_empty()
        });
        removed
    }

    /// Deliver `payload` to every current subscriber of `topic`.
    ///
    /// Returns the number of subscribers the payload was queued for.
    pub fn publish(&self, topic: &Topic, payload: &Arc<str>) -> usize {
        let topics = self.topics.read();
        let Some(subscribers) = topics.get(topic) else {
            debug!(%topic, "publish to topic without subscribers");
            return 0;
        };
        let mut delivered = 0;
        for (session_id, conn) in subscribers {
            if conn.send(Arc::clone(payload)) {
                delivered += 1;
            } else {
                counter!(RELAY_DELIVERY_DROPS_TOTAL).increment(1);
                warn!(%topic, %session_id, "failed to queue message for client");
            }
        }
        debug!(%topic, recipients = delivered, "published");
        delivered
    }

    /// Serialize `event` and publish it on `topic`.
    pub fn publish_event(&self, topic: &Topic, event: &ServerEvent) -> usize {
        match event.to_json() {
            Ok(json) => self.publish(topic, &Arc::from(json)),
            Err(e) => {
                warn!(%topic, error = %e, "failed to serialize event");
                0
            }
        }
    }

    /// Send `event` to one connection only, bypassing topics.
    pub fn send_direct(&self, connection: &ClientConnection, event: &ServerEvent) -> bool {
        match event.to_json() {
            Ok(json) => {
                let sent = connection.send(Arc::from(json));
                if !sent {
                    counter!(RELAY_DELIVERY_DROPS_TOTAL).increment(1);
                }
                sent
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize event");
                false
            }
        }
    }

    /// Number of subscribers of `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.read().get(topic).map_or(0, HashMap::len)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }
}

impl Default for TopicRouter {
    fn default() -> Self {
        Self::new()
    }
}
