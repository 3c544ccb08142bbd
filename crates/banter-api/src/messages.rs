use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::error;

use banter_types::message::Message;

use crate::AppStateInner;

/// Direct-message history between two users, oldest first. The pair is
/// unordered, so `/messages/private/alice/bob` and
/// `/messages/private/bob/alice` return the same rows.
pub async fn private_history(
    State(state): State<Arc<AppStateInner>>,
    Path((user_a, user_b)): Path<(String, String)>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    // Run the blocking store query off the async runtime
    let db = state.db.clone();
    let messages = tokio::task::spawn_blocking(move || db.private_history(&user_a, &user_b))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("private history query failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(messages))
}

/// Room history, oldest first.
pub async fn room_history(
    State(state): State<Arc<AppStateInner>>,
    Path(room): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let db = state.db.clone();
    let messages = tokio::task::spawn_blocking(move || db.room_history(&room))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("room history query failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_db::Database;
    use banter_gateway::presence::PresenceRegistry;

    fn state() -> Arc<AppStateInner> {
        Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            presence: PresenceRegistry::new(),
        })
    }

    #[tokio::test]
    async fn private_history_is_symmetric_in_the_path_order() {
        let state = state();
        state.db.insert_private("alice", "bob", "hi").unwrap();
        state.db.insert_private("bob", "alice", "hello").unwrap();
        state.db.insert_private("alice", "carol", "other").unwrap();

        let Json(forward) = private_history(
            State(state.clone()),
            Path(("alice".into(), "bob".into())),
        )
        .await
        .unwrap();
        let Json(reverse) = private_history(
            State(state.clone()),
            Path(("bob".into(), "alice".into())),
        )
        .await
        .unwrap();

        let contents: Vec<_> = forward.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["hi", "hello"]);
        assert_eq!(forward.len(), reverse.len());
        assert_eq!(forward[0].id, reverse[0].id);
    }

    #[tokio::test]
    async fn room_history_returns_only_that_room() {
        let state = state();
        state.db.insert_room("alice", "lobby", "one").unwrap();
        state.db.insert_room("bob", "dev", "two").unwrap();

        let Json(messages) = room_history(State(state.clone()), Path("lobby".into()))
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "one");
        assert_eq!(messages[0].room.as_deref(), Some("lobby"));
    }

    #[tokio::test]
    async fn unknown_conversations_yield_empty_lists() {
        let state = state();

        let Json(private) = private_history(
            State(state.clone()),
            Path(("nobody".into(), "noone".into())),
        )
        .await
        .unwrap();
        let Json(room) = room_history(State(state), Path("ghost-town".into()))
            .await
            .unwrap();

        assert!(private.is_empty());
        assert!(room.is_empty());
    }
}
