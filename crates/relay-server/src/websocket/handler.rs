//! WebSocket message dispatch: parses incoming text as a `ClientCommand`
//! and routes it to the public topic, a private topic, or the hub.

use metrics::counter;
use relay_core::{ClientCommand, DropReason, ServerEvent, SessionId, Topic};
use tracing::{debug, instrument};

use super::hub::Hub;
use crate::metrics::{RELAY_COMMANDS_DROPPED_TOTAL, RELAY_COMMANDS_TOTAL};

/// What happened to one inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandleOutcome {
    /// A message was published.
    Published {
        /// Topic the message went to.
        topic: Topic,
        /// Subscribers it was queued for.
        recipients: usize,
    },
    /// The sender's display name changed.
    Renamed,
    /// The sender has no presence entry, so there was nothing to rename.
    SenderOffline,
    /// The input was ignored; nothing is sent back.
    Dropped(DropReason),
}

/// Handle one inbound text frame from `sender`.
///
/// `user_from` on every re-emitted message is `sender`, whatever the payload
/// claims. `user_to` is trusted as given; an id nobody holds simply reaches
/// nobody.
#[instrument(skip_all, fields(session_id = %sender, command))]
pub fn handle_message(text: &str, sender: SessionId, hub: &Hub) -> HandleOutcome {
    let command = ClientCommand::parse(text);
    let _ = tracing::Span::current().record("command", command.name());
    counter!(RELAY_COMMANDS_TOTAL, "command" => command.name()).increment(1);

    match command {
        ClientCommand::PublicMsg { text } => {
            let topic = Topic::Public;
            let event = ServerEvent::PublicMsg {
                text,
                user_from: sender,
            };
            let recipients = hub.router().publish_event(&topic, &event);
            debug!(recipients, "public message");
            HandleOutcome::Published { topic, recipients }
        }
        ClientCommand::PrivateMsg { text, user_to } => {
            let topic = Topic::private(user_to);
            let event = ServerEvent::PrivateMsg {
                text,
                user_from: sender,
            };
            let recipients = hub.router().publish_event(&topic, &event);
            debug!(%user_to, target_online = hub.is_online(user_to), recipients, "private message");
            HandleOutcome::Published { topic, recipients }
        }
        ClientCommand::SetName { name } => {
            if hub.rename(sender, name) {
                HandleOutcome::Renamed
            } else {
                HandleOutcome::SenderOffline
            }
        }
        ClientCommand::Unrecognized(reason) => {
            counter!(RELAY_COMMANDS_DROPPED_TOTAL, "reason" => reason.kind()).increment(1);
            debug!(reason = reason.kind(), detail = ?reason, "dropped inbound message");
            HandleOutcome::Dropped(reason)
        }
    }
}
