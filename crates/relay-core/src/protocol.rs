//! Wire envelopes.
//!
//! Inbound text is turned into a [`ClientCommand`] by a strict
//! parse-and-validate step. Anything that is not a well-formed known command
//! becomes [`ClientCommand::Unrecognized`] carrying a [`DropReason`]; parsing
//! itself never fails. Outbound payloads are [`ServerEvent`]s.
//!
//! Both directions use a `command` discriminator field:
//!
//! ```text
//! client → {"command":"public_msg","text":"hi"}
//! client → {"command":"private_msg","text":"psst","user_to":11}
//! client → {"command":"set_name","name":"alice"}
//! server → {"command":"public_msg","text":"hi","user_from":10}
//! server → {"command":"private_msg","text":"psst","user_from":10}
//! server → {"command":"status","user_id":10,"name":"alice","online":true}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::SessionId;
use crate::presence::SessionInfo;

/// Command names accepted from clients.
pub const KNOWN_COMMANDS: [&str; 3] = ["public_msg", "private_msg", "set_name"];

/// A validated inbound command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientCommand {
    /// Broadcast `text` to the public topic.
    PublicMsg {
        /// Message body.
        text: String,
    },
    /// Deliver `text` to the private topic of `user_to`.
    PrivateMsg {
        /// Message body.
        text: String,
        /// Recipient session. Not checked for existence.
        user_to: SessionId,
    },
    /// Change the sender's display name.
    SetName {
        /// New display name.
        name: String,
    },
    /// Input that is dropped without a reply.
    Unrecognized(DropReason),
}

/// Why an inbound payload was dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Not valid JSON, or not a JSON object.
    Malformed,
    /// No `command` field, or it is not a string.
    MissingCommand,
    /// `command` names nothing we know.
    UnknownCommand(String),
    /// Known command with missing or mistyped fields.
    InvalidFields {
        /// The command that failed validation.
        command: String,
        /// Deserializer message.
        reason: String,
    },
}

impl DropReason {
    /// Stable short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::MissingCommand => "missing_command",
            Self::UnknownCommand(_) => "unknown_command",
            Self::InvalidFields { .. } => "invalid_fields",
        }
    }
}

/// Serde shape of the known commands. Unknown extra fields (including a
/// client-supplied `user_from`) are ignored.
#[derive(Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum WireCommand {
    PublicMsg { text: String },
    PrivateMsg { text: String, user_to: SessionId },
    SetName { name: String },
}

impl From<WireCommand> for ClientCommand {
    fn from(wire: WireCommand) -> Self {
        match wire {
            WireCommand::PublicMsg { text } => Self::PublicMsg { text },
            WireCommand::PrivateMsg { text, user_to } => Self::PrivateMsg { text, user_to },
            WireCommand::SetName { name } => Self::SetName { name },
        }
    }
}

impl ClientCommand {
    /// Parse and validate one inbound text frame.
    pub fn parse(raw: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return Self::Unrecognized(DropReason::Malformed);
        };
        let Some(object) = value.as_object() else {
            return Self::Unrecognized(DropReason::Malformed);
        };
        let Some(command) = object.get("command").and_then(Value::as_str) else {
            return Self::Unrecognized(DropReason::MissingCommand);
        };
        if !KNOWN_COMMANDS.contains(&command) {
            return Self::Unrecognized(DropReason::UnknownCommand(command.to_owned()));
        }
        let command = command.to_owned();

        match serde_json::from_value::<WireCommand>(value) {
            Ok(wire) => wire.into(),
            Err(e) => Self::Unrecognized(DropReason::InvalidFields {
                command,
                reason: e.to_string(),
            }),
        }
    }

    /// Command label (`"unrecognized"` for dropped input).
    pub fn name(&self) -> &'static str {
        match self {
            Self::PublicMsg { .. } => "public_msg",
            Self::PrivateMsg { .. } => "private_msg",
            Self::SetName { .. } => "set_name",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// An outbound envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A public message, fanned out on the public topic.
    PublicMsg {
        /// Message body.
        text: String,
        /// Sender, always taken from the sender's own session.
        user_from: SessionId,
    },
    /// A directed message, published on the recipient's private topic.
    PrivateMsg {
        /// Message body.
        text: String,
        /// Sender, always taken from the sender's own session.
        user_from: SessionId,
    },
    /// Presence announcement.
    Status {
        /// Session the announcement is about.
        user_id: SessionId,
        /// Current display name.
        name: String,
        /// `true` while connected, `false` once gone.
        online: bool,
    },
}

impl ServerEvent {
    /// Presence announcement for `info`.
    pub fn status(info: &SessionInfo, online: bool) -> Self {
        Self::Status {
            user_id: info.id,
            name: info.name.clone(),
            online,
        }
    }

    /// Serialize to wire text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parse_public_msg() {
        let cmd = ClientCommand::parse(r#"{"command":"public_msg","text":"hi"}"#);
        assert_eq!(cmd, ClientCommand::PublicMsg { text: "hi".into() });
        assert_eq!(cmd.name(), "public_msg");
    }

    #[test]
    fn parse_private_msg() {
        let cmd = ClientCommand::parse(r#"{"command":"private_msg","text":"psst","user_to":11}"#);
        assert_eq!(
            cmd,
            ClientCommand::PrivateMsg {
                text: "psst".into(),
                user_to: SessionId::new(11),
            }
        );
    }

    #[test]
    fn parse_set_name() {
        let cmd = ClientCommand::parse(r#"{"command":"set_name","name":"alice"}"#);
        assert_eq!(cmd, ClientCommand::SetName { name: "alice".into() });
    }

    #[test]
    fn client_supplied_user_from_is_ignored() {
        let cmd = ClientCommand::parse(r#"{"command":"public_msg","text":"x","user_from":999}"#);
        assert_eq!(cmd, ClientCommand::PublicMsg { text: "x".into() });
    }

    #[test]
    fn extra_fields_ignored() {
        let cmd = ClientCommand::parse(r#"{"command":"set_name","name":"bob","color":"red"}"#);
        assert_eq!(cmd, ClientCommand::SetName { name: "bob".into() });
    }

    #[test]
    fn invalid_json_is_malformed() {
        let cmd = ClientCommand::parse("not json at all");
        assert_eq!(cmd, ClientCommand::Unrecognized(DropReason::Malformed));
        assert_eq!(cmd.name(), "unrecognized");
    }

    #[test]
    fn empty_input_is_malformed() {
        assert_eq!(
            ClientCommand::parse(""),
            ClientCommand::Unrecognized(DropReason::Malformed)
        );
    }

    #[test]
    fn non_object_is_malformed() {
        assert_eq!(
            ClientCommand::parse("[1,2,3]"),
            ClientCommand::Unrecognized(DropReason::Malformed)
        );
        assert_eq!(
            ClientCommand::parse(r#""public_msg""#),
            ClientCommand::Unrecognized(DropReason::Malformed)
        );
    }

    #[test]
    fn missing_command() {
        assert_eq!(
            ClientCommand::parse(r#"{"text":"hi"}"#),
            ClientCommand::Unrecognized(DropReason::MissingCommand)
        );
    }

    #[test]
    fn non_string_command() {
        assert_eq!(
            ClientCommand::parse(r#"{"command":7,"text":"hi"}"#),
            ClientCommand::Unrecognized(DropReason::MissingCommand)
        );
    }

    #[test]
    fn unknown_command() {
        let cmd = ClientCommand::parse(r#"{"command":"publick_msg","text":"hi"}"#);
        assert_matches!(
            cmd,
            ClientCommand::Unrecognized(DropReason::UnknownCommand(ref name)) if name == "publick_msg"
        );
    }

    #[test]
    fn outbound_only_command_is_unknown() {
        let cmd = ClientCommand::parse(r#"{"command":"status","user_id":1,"name":"x","online":true}"#);
        assert_matches!(cmd, ClientCommand::Unrecognized(DropReason::UnknownCommand(_)));
    }

    #[test]
    fn missing_text_is_invalid_fields() {
        let cmd = ClientCommand::parse(r#"{"command":"public_msg"}"#);
        assert_matches!(
            cmd,
            ClientCommand::Unrecognized(DropReason::InvalidFields { ref command, .. }) if command == "public_msg"
        );
    }

    #[test]
    fn non_string_text_is_invalid_fields() {
        let cmd = ClientCommand::parse(r#"{"command":"public_msg","text":42}"#);
        assert_matches!(cmd, ClientCommand::Unrecognized(DropReason::InvalidFields { .. }));
    }

    #[test]
    fn string_user_to_is_invalid_fields() {
        let cmd = ClientCommand::parse(r#"{"command":"private_msg","text":"x","user_to":"11"}"#);
        assert_matches!(
            cmd,
            ClientCommand::Unrecognized(DropReason::InvalidFields { ref command, .. }) if command == "private_msg"
        );
    }

    #[test]
    fn negative_user_to_is_invalid_fields() {
        let cmd = ClientCommand::parse(r#"{"command":"private_msg","text":"x","user_to":-1}"#);
        assert_matches!(cmd, ClientCommand::Unrecognized(DropReason::InvalidFields { .. }));
    }

    #[test]
    fn fractional_user_to_is_invalid_fields() {
        let cmd = ClientCommand::parse(r#"{"command":"private_msg","text":"x","user_to":10.5}"#);
        assert_matches!(cmd, ClientCommand::Unrecognized(DropReason::InvalidFields { .. }));
    }

    #[test]
    fn missing_name_is_invalid_fields() {
        let cmd = ClientCommand::parse(r#"{"command":"set_name"}"#);
        assert_matches!(cmd, ClientCommand::Unrecognized(DropReason::InvalidFields { .. }));
    }

    #[test]
    fn drop_reason_kinds() {
        assert_eq!(DropReason::Malformed.kind(), "malformed");
        assert_eq!(DropReason::MissingCommand.kind(), "missing_command");
        assert_eq!(DropReason::UnknownCommand("x".into()).kind(), "unknown_command");
        assert_eq!(
            DropReason::InvalidFields {
                command: "set_name".into(),
                reason: String::new(),
            }
            .kind(),
            "invalid_fields"
        );
    }

    #[test]
    fn public_msg_wire_shape() {
        let event = ServerEvent::PublicMsg {
            text: "hi".into(),
            user_from: SessionId::new(10),
        };
        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"command": "public_msg", "text": "hi", "user_from": 10}));
    }

    #[test]
    fn private_msg_wire_shape() {
        let event = ServerEvent::PrivateMsg {
            text: "psst".into(),
            user_from: SessionId::new(12),
        };
        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"command": "private_msg", "text": "psst", "user_from": 12}));
    }

    #[test]
    fn status_wire_shape() {
        let info = SessionInfo::new(SessionId::new(11));
        let value: Value =
            serde_json::from_str(&ServerEvent::status(&info, false).to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"command": "status", "user_id": 11, "name": "noname", "online": false})
        );
    }

    #[test]
    fn status_carries_current_name() {
        let mut info = SessionInfo::new(SessionId::new(10));
        info.name = "alice".into();
        assert_eq!(
            ServerEvent::status(&info, true),
            ServerEvent::Status {
                user_id: SessionId::new(10),
                name: "alice".into(),
                online: true,
            }
        );
    }
}
