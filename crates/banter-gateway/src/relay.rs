use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use banter_db::Database;
use banter_types::events::{ClientEvent, RoomEvent, ServerEvent};

use crate::ConnId;
use crate::dispatcher::Dispatcher;
use crate::presence::PresenceRegistry;

/// The routing engine. Each inbound event is validated, persisted when it
/// must outlive the connection, then delivered through the dispatcher.
///
/// Invalid or incomplete events are dropped without a reply; that is the
/// protocol, not an error path. Store failures are logged and the event's
/// remaining effects skipped, but they never tear down the connection or
/// the process.
#[derive(Clone)]
pub struct Relay {
    db: Arc<Database>,
    presence: PresenceRegistry,
    dispatcher: Dispatcher,
}

impl Relay {
    pub fn new(db: Arc<Database>, presence: PresenceRegistry, dispatcher: Dispatcher) -> Self {
        Self {
            db,
            presence,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Handle one inbound event from `conn`.
    pub async fn handle_event(&self, conn: ConnId, event: ClientEvent) {
        match event {
            ClientEvent::Register { username } => self.register(conn, username).await,
            ClientEvent::PrivateMessage { to, content, from } => {
                self.private_message(conn, to, content, from).await
            }
            ClientEvent::JoinRoom { room } => self.join_room(conn, room).await,
            ClientEvent::LeaveRoom { room } => self.leave_room(conn, room).await,
            ClientEvent::RoomMessage {
                room,
                content,
                from,
            } => self.room_message(conn, room, content, from).await,
            ClientEvent::TypingPrivate { to } => self.typing_private(conn, to).await,
            ClientEvent::TypingRoom { room } => self.typing_room(conn, room).await,
            ClientEvent::MarkSeen { message_id } => self.mark_seen(message_id).await,
        }
    }

    /// Connection closed: drop it from the dispatcher, release its presence
    /// entry and announce the shrunken online list.
    pub async fn handle_disconnect(&self, conn: ConnId) {
        self.dispatcher.unregister(conn).await;
        match self.presence.set_offline(conn).await {
            Some(username) => info!("{} ({}) disconnected", username, conn),
            None => info!("{} disconnected before registering", conn),
        }
        self.broadcast_online_users().await;
    }

    async fn register(&self, conn: ConnId, username: String) {
        if username.is_empty() {
            return;
        }
        self.presence.set_online(&username, conn).await;
        info!("{} registered on {}", username, conn);
        self.broadcast_online_users().await;
    }

    async fn private_message(
        &self,
        conn: ConnId,
        to: String,
        content: String,
        from: Option<String>,
    ) {
        let Some(sender) = self.resolve_sender(conn, from).await else {
            return;
        };
        let content = content.trim().to_string();
        if to.is_empty() || content.is_empty() {
            return;
        }

        // Persist before delivery: the message must survive even if nobody
        // is there to receive it.
        let saved = {
            let (sender, to) = (sender.clone(), to.clone());
            self.store(move |db| db.insert_private(&sender, &to, &content))
                .await
        };
        let saved = match saved {
            Ok(message) => message,
            Err(e) => {
                error!("failed to persist private message from {}: {}", sender, e);
                return;
            }
        };

        if let Some(target) = self.presence.connection_for(&to).await {
            self.dispatcher
                .send_to(target, ServerEvent::PrivateMessage(saved.clone()))
                .await;
        }

        // Echo to the sender so its view carries the store-assigned id and
        // timestamps.
        self.dispatcher
            .send_to(conn, ServerEvent::PrivateMessage(saved))
            .await;
    }

    async fn join_room(&self, conn: ConnId, room: String) {
        if room.is_empty() {
            return;
        }
        self.dispatcher.join_room(&room, conn).await;
        let user = self.user_label(conn).await;
        debug!("{} joined room {}", user, room);
        self.dispatcher
            .send_to_room(
                &room,
                ServerEvent::RoomInfo {
                    event: RoomEvent::Join,
                    user,
                    room: room.clone(),
                },
                None,
            )
            .await;
    }

    async fn leave_room(&self, conn: ConnId, room: String) {
        if room.is_empty() {
            return;
        }
        // Leave first, then notify: the announcement goes to the remaining
        // members only.
        self.dispatcher.leave_room(&room, conn).await;
        let user = self.user_label(conn).await;
        debug!("{} left room {}", user, room);
        self.dispatcher
            .send_to_room(
                &room,
                ServerEvent::RoomInfo {
                    event: RoomEvent::Leave,
                    user,
                    room: room.clone(),
                },
                None,
            )
            .await;
    }

    async fn room_message(&self, conn: ConnId, room: String, content: String, from: Option<String>) {
        let Some(sender) = self.resolve_sender(conn, from).await else {
            return;
        };
        let content = content.trim().to_string();
        if room.is_empty() || content.is_empty() {
            return;
        }

        let saved = {
            let (sender, room) = (sender.clone(), room.clone());
            self.store(move |db| db.insert_room(&sender, &room, &content))
                .await
        };
        let saved = match saved {
            Ok(message) => message,
            Err(e) => {
                error!(
                    "failed to persist room message from {} to {}: {}",
                    sender, room, e
                );
                return;
            }
        };

        // The sender gets its copy through the room like every other member.
        self.dispatcher
            .send_to_room(&room, ServerEvent::RoomMessage(saved), None)
            .await;
    }

    async fn typing_private(&self, conn: ConnId, to: String) {
        let Some(from) = self.presence.identity_for(conn).await else {
            return;
        };
        if to.is_empty() {
            return;
        }
        if let Some(target) = self.presence.connection_for(&to).await {
            self.dispatcher
                .send_to(target, ServerEvent::TypingPrivate { from })
                .await;
        }
    }

    async fn typing_room(&self, conn: ConnId, room: String) {
        let Some(from) = self.presence.identity_for(conn).await else {
            return;
        };
        if room.is_empty() {
            return;
        }
        self.dispatcher
            .send_to_room(
                &room,
                ServerEvent::TypingRoom {
                    from,
                    room: room.clone(),
                },
                Some(conn),
            )
            .await;
    }

    async fn mark_seen(&self, message_id: String) {
        let id = message_id.clone();
        match self.store(move |db| db.mark_seen(&id)).await {
            Ok(true) => {}
            Ok(false) => debug!("markSeen for unknown message {}", message_id),
            Err(e) => error!("failed to mark message {} seen: {}", message_id, e),
        }
    }

    /// The sender of a message event: an explicit non-empty `from` override
    /// wins, otherwise the identity registered for this connection.
    async fn resolve_sender(&self, conn: ConnId, from: Option<String>) -> Option<String> {
        match from {
            Some(f) if !f.is_empty() => Some(f),
            _ => self.presence.identity_for(conn).await,
        }
    }

    /// Label used in room announcements: the username if registered, the
    /// connection id otherwise.
    async fn user_label(&self, conn: ConnId) -> String {
        self.presence
            .identity_for(conn)
            .await
            .unwrap_or_else(|| conn.to_string())
    }

    async fn broadcast_online_users(&self) {
        let users = self.presence.online_users().await;
        self.dispatcher.broadcast(ServerEvent::OnlineUsers(users)).await;
    }

    /// Run a blocking store operation off the async runtime.
    async fn store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| anyhow::anyhow!("store task join error: {}", e))?
    }
}
