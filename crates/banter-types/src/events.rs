use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Events sent FROM client TO server over the WebSocket.
///
/// Envelope is `{"type": "...", "data": {...}}`; type and field names are
/// camelCase to stay compatible with the existing web clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Claim a username for this connection (client sends after connecting).
    Register { username: String },

    /// Send a direct message. `from` overrides the registered identity when
    /// present and non-empty.
    PrivateMessage {
        to: String,
        content: String,
        #[serde(default)]
        from: Option<String>,
    },

    /// Enter a named room.
    JoinRoom { room: String },

    /// Leave a named room.
    LeaveRoom { room: String },

    /// Send a message to everyone in a room.
    RoomMessage {
        room: String,
        content: String,
        #[serde(default)]
        from: Option<String>,
    },

    /// Typing indicator for a direct conversation.
    TypingPrivate { to: String },

    /// Typing indicator for a room.
    TypingRoom { room: String },

    /// Flag a private message as read.
    MarkSeen { message_id: String },
}

/// Events sent FROM server TO clients over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full list of currently-online usernames; broadcast on every presence
    /// change.
    OnlineUsers(Vec<String>),

    /// A direct message, delivered to the receiver and echoed to the sender.
    PrivateMessage(Message),

    /// A room message, delivered to every member of the room.
    RoomMessage(Message),

    /// Somebody entered or left a room. `user` is the registered username,
    /// falling back to the connection id for unregistered connections.
    RoomInfo {
        event: RoomEvent,
        user: String,
        room: String,
    },

    /// The named user is typing in your direct conversation.
    TypingPrivate { from: String },

    /// The named user is typing in a room you are in.
    TypingRoom { from: String, room: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomEvent {
    Join,
    Leave,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_upstream_names() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"privateMessage","data":{"to":"bob","content":"hi","from":"alice"}}"#,
        )
        .unwrap();
        match event {
            ClientEvent::PrivateMessage { to, content, from } => {
                assert_eq!(to, "bob");
                assert_eq!(content, "hi");
                assert_eq!(from.as_deref(), Some("alice"));
            }
            other => panic!("decoded wrong event: {other:?}"),
        }

        // `from` is optional on message events
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"roomMessage","data":{"room":"lobby","content":"hey"}}"#)
                .unwrap();
        assert!(matches!(event, ClientEvent::RoomMessage { from: None, .. }));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"markSeen","data":{"messageId":"abc"}}"#).unwrap();
        assert!(matches!(event, ClientEvent::MarkSeen { message_id } if message_id == "abc"));
    }

    #[test]
    fn online_users_payload_is_a_bare_list() {
        let value =
            serde_json::to_value(ServerEvent::OnlineUsers(vec!["alice".into(), "bob".into()]))
                .unwrap();
        assert_eq!(value["type"], "onlineUsers");
        assert_eq!(value["data"], serde_json::json!(["alice", "bob"]));
    }

    #[test]
    fn room_info_serializes_event_kind_lowercase() {
        let value = serde_json::to_value(ServerEvent::RoomInfo {
            event: RoomEvent::Join,
            user: "alice".into(),
            room: "lobby".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "roomInfo");
        assert_eq!(value["data"]["event"], "join");
        assert_eq!(value["data"]["room"], "lobby");
    }
}
