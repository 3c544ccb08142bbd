use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use banter_types::events::ServerEvent;

use crate::ConnId;

/// Connection hub: owns the outbound queue of every live connection and the
/// room membership sets. Delivery is best effort; an event for a connection
/// that is gone is silently dropped.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-connection outbound channels; each is drained by that
    /// connection's writer task, so delivery to one connection is FIFO.
    connections: RwLock<HashMap<ConnId, mpsc::UnboundedSender<ServerEvent>>>,

    /// Explicit room membership. Empty rooms are pruned.
    rooms: RwLock<HashMap<String, HashSet<ConnId>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a new connection. Returns its id and the receiving end of its
    /// outbound queue.
    pub async fn register(&self) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.connections.write().await.insert(conn, tx);
        (conn, rx)
    }

    /// Remove a connection and take it out of every room it joined.
    pub async fn unregister(&self, conn: ConnId) {
        self.inner.connections.write().await.remove(&conn);

        let mut rooms = self.inner.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    pub async fn join_room(&self, room: &str, conn: ConnId) {
        self.inner
            .rooms
            .write()
            .await
            .entry(room.to_string())
            .or_default()
            .insert(conn);
    }

    pub async fn leave_room(&self, room: &str, conn: ConnId) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Deliver an event to one connection.
    pub async fn send_to(&self, conn: ConnId, event: ServerEvent) {
        if let Some(tx) = self.inner.connections.read().await.get(&conn) {
            let _ = tx.send(event);
        }
    }

    /// Deliver an event to every member of a room, optionally excluding one
    /// connection (the originator, for typing indicators).
    pub async fn send_to_room(&self, room: &str, event: ServerEvent, exclude: Option<ConnId>) {
        let rooms = self.inner.rooms.read().await;
        let Some(members) = rooms.get(room) else {
            return;
        };

        let connections = self.inner.connections.read().await;
        for conn in members {
            if Some(*conn) == exclude {
                continue;
            }
            if let Some(tx) = connections.get(conn) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Deliver an event to every live connection.
    pub async fn broadcast(&self, event: ServerEvent) {
        let connections = self.inner.connections.read().await;
        for tx in connections.values() {
            let _ = tx.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn room_delivery_respects_membership_and_exclusion() {
        let dispatcher = Dispatcher::new();
        let (a, mut rx_a) = dispatcher.register().await;
        let (b, mut rx_b) = dispatcher.register().await;
        let (_c, mut rx_c) = dispatcher.register().await;

        dispatcher.join_room("lobby", a).await;
        dispatcher.join_room("lobby", b).await;

        let event = ServerEvent::TypingRoom {
            from: "alice".into(),
            room: "lobby".into(),
        };
        dispatcher.send_to_room("lobby", event, Some(a)).await;

        assert!(drain(&mut rx_a).is_empty(), "originator must be excluded");
        assert_eq!(drain(&mut rx_b).len(), 1);
        assert!(drain(&mut rx_c).is_empty(), "non-member must not receive");
    }

    #[tokio::test]
    async fn unregister_leaves_all_rooms() {
        let dispatcher = Dispatcher::new();
        let (a, _rx_a) = dispatcher.register().await;
        let (b, mut rx_b) = dispatcher.register().await;

        dispatcher.join_room("lobby", a).await;
        dispatcher.join_room("lobby", b).await;
        dispatcher.unregister(a).await;

        let event = ServerEvent::OnlineUsers(vec![]);
        dispatcher.send_to_room("lobby", event, None).await;
        assert_eq!(drain(&mut rx_b).len(), 1);
        // the removed connection's queue saw nothing further
    }

    #[tokio::test]
    async fn send_to_unknown_connection_is_a_noop() {
        let dispatcher = Dispatcher::new();
        // no panic, nothing to assert beyond completion
        dispatcher
            .send_to(Uuid::new_v4(), ServerEvent::OnlineUsers(vec![]))
            .await;
        dispatcher
            .send_to_room("ghost-room", ServerEvent::OnlineUsers(vec![]), None)
            .await;
    }
}
