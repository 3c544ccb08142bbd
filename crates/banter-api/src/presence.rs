use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use banter_types::api::LastSeenResponse;

use crate::AppStateInner;

/// When the user last disconnected. `lastSeen` is null for users the relay
/// has never seen and for users who are currently online.
pub async fn last_seen(
    State(state): State<Arc<AppStateInner>>,
    Path(username): Path<String>,
) -> Json<LastSeenResponse> {
    let last_seen = state.presence.last_seen(&username).await;
    Json(LastSeenResponse {
        username,
        last_seen,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_db::Database;
    use banter_gateway::ConnId;
    use banter_gateway::presence::PresenceRegistry;
    use chrono::Utc;

    fn state() -> Arc<AppStateInner> {
        Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            presence: PresenceRegistry::new(),
        })
    }

    #[tokio::test]
    async fn reports_the_disconnect_time() {
        let state = state();
        let conn = ConnId::new_v4();
        state.presence.set_online("alice", conn).await;
        let before = Utc::now();
        state.presence.set_offline(conn).await;

        let Json(resp) = last_seen(State(state), Path("alice".into())).await;

        assert_eq!(resp.username, "alice");
        assert!(resp.last_seen.expect("recorded on disconnect") >= before);
    }

    #[tokio::test]
    async fn unknown_and_still_online_users_have_no_last_seen() {
        let state = state();
        state.presence.set_online("bob", ConnId::new_v4()).await;

        let Json(unknown) = last_seen(State(state.clone()), Path("ghost".into())).await;
        let Json(online) = last_seen(State(state), Path("bob".into())).await;

        assert!(unknown.last_seen.is_none());
        assert!(online.last_seen.is_none());

        // the wire shape keeps an explicit null rather than omitting the field
        let body = serde_json::to_value(&unknown).unwrap();
        assert_eq!(body["lastSeen"], serde_json::Value::Null);
    }
}
