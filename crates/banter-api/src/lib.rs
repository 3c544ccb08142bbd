pub mod messages;
pub mod presence;

use std::sync::Arc;

use axum::Json;

use banter_db::Database;
use banter_gateway::presence::PresenceRegistry;
use banter_types::api::HealthResponse;

pub type AppState = Arc<AppStateInner>;

/// Shared state behind the HTTP routes. The store and the presence registry
/// are the same instances the relay writes through, so history reads see
/// every message the relay has accepted.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub presence: PresenceRegistry,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
