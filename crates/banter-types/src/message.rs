use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Whether a message was addressed to a single user or to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Private,
    Room,
}

impl MessageKind {
    /// Storage text for the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Private => "private",
            MessageKind::Room => "room",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown message kind: {0}")]
pub struct ParseMessageKindError(String);

impl FromStr for MessageKind {
    type Err = ParseMessageKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(MessageKind::Private),
            "room" => Ok(MessageKind::Room),
            other => Err(ParseMessageKindError(other.to_string())),
        }
    }
}

/// A persisted chat message, exactly as it appears on the wire.
///
/// `receiver` is present iff `kind` is private, `room` iff `kind` is room.
/// Id and timestamps are assigned by the store at persistence time, so a
/// delivered or echoed message always matches the history the store returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub kind: MessageKind,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub content: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_storage_text_round_trips() {
        assert_eq!("private".parse::<MessageKind>().unwrap(), MessageKind::Private);
        assert_eq!("room".parse::<MessageKind>().unwrap(), MessageKind::Room);
        assert!("broadcast".parse::<MessageKind>().is_err());
    }

    #[test]
    fn private_message_omits_room_on_the_wire() {
        let msg = Message {
            id: Uuid::new_v4(),
            kind: MessageKind::Private,
            sender: "alice".into(),
            receiver: Some("bob".into()),
            room: None,
            content: "hi".into(),
            seen: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["kind"], "private");
        assert_eq!(value["receiver"], "bob");
        assert!(value.get("room").is_none());
        assert!(value.get("createdAt").is_some());
    }
}
