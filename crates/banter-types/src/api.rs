use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- History / presence lookups --

/// `lastSeen` is null for users who have never been online or are online
/// right now; the registry does not distinguish the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSeenResponse {
    pub username: String,
    pub last_seen: Option<DateTime<Utc>>,
}

// -- Health --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
