//! The session wire protocol.
//!
//! Every session message is one UTF-8 JSON envelope. Payloads travel
//! JSON-encoded inside the envelope's `message` field, so the envelope
//! shape is identical for every message type.

use serde::{Deserialize, Serialize};

use crate::storage::ActionRecord;

/// Discriminator over the closed set of session messages. Client-sent
/// types come first; the rest only ever travel server to client. Anything
/// unrecognised lands on `Unknown`, which the hub answers with an `Error`
/// envelope instead of dropping the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    Join,
    Action,
    SendFullGame,
    RejectAction,
    GameOver,
    GameJoined,
    FullGame,
    Error,
    Unknown,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Join => "Join",
            MessageType::Action => "Action",
            MessageType::SendFullGame => "SendFullGame",
            MessageType::RejectAction => "RejectAction",
            MessageType::GameOver => "GameOver",
            MessageType::GameJoined => "GameJoined",
            MessageType::FullGame => "FullGame",
            MessageType::Error => "Error",
            MessageType::Unknown => "Unknown",
        }
    }
}

impl From<String> for MessageType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Join" => MessageType::Join,
            "Action" => MessageType::Action,
            "SendFullGame" => MessageType::SendFullGame,
            "RejectAction" => MessageType::RejectAction,
            "GameOver" => MessageType::GameOver,
            "GameJoined" => MessageType::GameJoined,
            "FullGame" => MessageType::FullGame,
            "Error" => MessageType::Error,
            _ => MessageType::Unknown,
        }
    }
}

impl From<MessageType> for String {
    fn from(value: MessageType) -> Self {
        value.as_str().to_string()
    }
}

/// The session envelope. Clients fill `token` on every message; outbound
/// envelopes carry the `game_id` with the token left empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub game_id: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Envelope {
    /// Build a server-originated envelope with a JSON-encoded payload.
    pub fn server<T: Serialize>(
        game_id: i64,
        message_type: MessageType,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            game_id,
            token: String::new(),
            message_type,
            message: serde_json::to_string(payload)?,
        })
    }

    /// Build a server-originated envelope carrying free text (errors,
    /// game results).
    pub fn server_text(game_id: i64, message_type: MessageType, message: impl Into<String>) -> Self {
        Self {
            game_id,
            token: String::new(),
            message_type,
            message: message.into(),
        }
    }
}

/// Payload of `GameJoined`: the snapshot a subscriber starts from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameJoinedPayload {
    pub player: String,
    pub game_token: String,
    pub white_player: String,
    pub black_player: String,
    pub actions: Vec<ActionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip() {
        let envelope = Envelope {
            game_id: 7,
            token: "abc".to_string(),
            message_type: MessageType::Action,
            message: r#"{"action_num":1,"action":"e4","signature":"s"}"#.to_string(),
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.game_id, 7);
        assert_eq!(parsed.token, "abc");
        assert_eq!(parsed.message_type, MessageType::Action);

        let action: ActionRecord = serde_json::from_str(&parsed.message).unwrap();
        assert_eq!(action.action_num, 1);
        assert_eq!(action.action, "e4");
    }

    #[test]
    fn unknown_message_type_still_parses() {
        let parsed: Envelope = serde_json::from_str(
            r#"{"game_id":1,"token":"t","message_type":"Telepathy","message":""}"#,
        )
        .unwrap();
        assert_eq!(parsed.message_type, MessageType::Unknown);
    }

    #[test]
    fn missing_fields_default() {
        let parsed: Envelope =
            serde_json::from_str(r#"{"game_id":2,"message_type":"SendFullGame"}"#).unwrap();
        assert!(parsed.token.is_empty());
        assert!(parsed.message.is_empty());
    }

    #[test]
    fn server_envelope_has_empty_token() {
        let envelope = Envelope::server(3, MessageType::FullGame, &Vec::<ActionRecord>::new()).unwrap();
        assert!(envelope.token.is_empty());
        assert_eq!(envelope.message, "[]");

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("token"));
    }

    #[test]
    fn action_payload_tolerates_missing_signature() {
        let action: ActionRecord = serde_json::from_str(r#"{"action_num":4,"action":"b"}"#).unwrap();
        assert_eq!(action.action_num, 4);
        assert!(action.signature.is_empty());
    }
}
