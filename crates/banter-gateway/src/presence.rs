use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::ConnId;

/// Single source of truth for who is online, on which connection, and when
/// they were last seen.
///
/// Both directional maps live under one lock, so every operation is atomic
/// relative to every other: an identity maps to a connection iff that
/// connection maps back to the same identity, at all observable points.
/// State is in-memory only and lives for the process lifetime.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<PresenceInner>>,
}

#[derive(Default)]
struct PresenceInner {
    conn_by_identity: HashMap<String, ConnId>,
    identity_by_conn: HashMap<ConnId, String>,
    last_seen: HashMap<String, DateTime<Utc>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `identity` with `conn`, unconditionally. Last writer wins:
    /// any previous connection of the identity and any previous identity of
    /// the connection are unlinked first, so the two maps stay mutual
    /// inverses.
    pub async fn set_online(&self, identity: &str, conn: ConnId) {
        let mut inner = self.inner.write().await;

        if let Some(old_conn) = inner.conn_by_identity.get(identity).copied() {
            if old_conn != conn {
                inner.identity_by_conn.remove(&old_conn);
            }
        }
        if let Some(old_identity) = inner.identity_by_conn.get(&conn).cloned() {
            if old_identity != identity {
                inner.conn_by_identity.remove(&old_identity);
            }
        }

        inner.conn_by_identity.insert(identity.to_string(), conn);
        inner.identity_by_conn.insert(conn, identity.to_string());
    }

    /// Remove the mapping owned by `conn` and record the moment its identity
    /// went offline. A connection that is unknown (or already removed) is a
    /// no-op returning `None`.
    pub async fn set_offline(&self, conn: ConnId) -> Option<String> {
        let mut inner = self.inner.write().await;

        let identity = inner.identity_by_conn.remove(&conn)?;
        inner.conn_by_identity.remove(&identity);
        inner.last_seen.insert(identity.clone(), Utc::now());
        Some(identity)
    }

    pub async fn connection_for(&self, identity: &str) -> Option<ConnId> {
        self.inner.read().await.conn_by_identity.get(identity).copied()
    }

    pub async fn identity_for(&self, conn: ConnId) -> Option<String> {
        self.inner.read().await.identity_by_conn.get(&conn).cloned()
    }

    /// Snapshot of everyone currently online, sorted for stable output.
    pub async fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .inner
            .read()
            .await
            .conn_by_identity
            .keys()
            .cloned()
            .collect();
        users.sort();
        users
    }

    /// When the identity last went offline. `None` means never connected or
    /// online right now.
    pub async fn last_seen(&self, identity: &str) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_seen.get(identity).copied()
    }
}
