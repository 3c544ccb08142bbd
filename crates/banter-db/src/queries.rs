use anyhow::Result;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Row, params};
use uuid::Uuid;

use banter_types::message::{Message, MessageKind};

use crate::Database;

impl Database {
    /// Persist a direct message. The store assigns id and timestamps; the
    /// returned message is exactly what history queries will yield.
    pub fn insert_private(&self, sender: &str, receiver: &str, content: &str) -> Result<Message> {
        self.insert_message(MessageKind::Private, sender, Some(receiver), None, content)
    }

    /// Persist a room message.
    pub fn insert_room(&self, sender: &str, room: &str, content: &str) -> Result<Message> {
        self.insert_message(MessageKind::Room, sender, None, Some(room), content)
    }

    fn insert_message(
        &self,
        kind: MessageKind,
        sender: &str,
        receiver: Option<&str>,
        room: Option<&str>,
        content: &str,
    ) -> Result<Message> {
        let id = Uuid::new_v4();
        // Truncate to the stored precision so the returned timestamps compare
        // equal to what a later read parses back.
        let now = Utc::now().trunc_subsecs(6);
        let stamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, kind, sender, receiver, room, content, seen, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
                params![id.to_string(), kind.as_str(), sender, receiver, room, content, stamp],
            )?;
            Ok(())
        })?;

        Ok(Message {
            id,
            kind,
            sender: sender.to_string(),
            receiver: receiver.map(str::to_string),
            room: room.map(str::to_string),
            content: content.to_string(),
            seen: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Flag a message as read. Returns false when no such message exists.
    pub fn mark_seen(&self, id: &str) -> Result<bool> {
        let stamp = Utc::now()
            .trunc_subsecs(6)
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET seen = 1, updated_at = ?2 WHERE id = ?1",
                params![id, stamp],
            )?;
            Ok(changed > 0)
        })
    }

    /// Direct-message history between two users, oldest first. The pair is
    /// unordered: messages in both directions are returned.
    pub fn private_history(&self, a: &str, b: &str) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, sender, receiver, room, content, seen, created_at, updated_at
                 FROM messages
                 WHERE kind = 'private'
                   AND ((sender = ?1 AND receiver = ?2) OR (sender = ?2 AND receiver = ?1))
                 ORDER BY created_at, rowid",
            )?;

            let rows = stmt
                .query_map(params![a, b], row_to_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Room history, oldest first.
    pub fn room_history(&self, room: &str) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, sender, receiver, room, content, seen, created_at, updated_at
                 FROM messages
                 WHERE kind = 'room' AND room = ?1
                 ORDER BY created_at, rowid",
            )?;

            let rows = stmt
                .query_map(params![room], row_to_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get(0)?;
    let kind: String = row.get(1)?;

    Ok(Message {
        id: id.parse().map_err(|e| corrupt_column(0, e))?,
        kind: kind.parse().map_err(|e| corrupt_column(1, e))?,
        sender: row.get(2)?,
        receiver: row.get(3)?,
        room: row.get(4)?,
        content: row.get(5)?,
        seen: row.get(6)?,
        created_at: parse_stamp(7, row.get(7)?)?,
        updated_at: parse_stamp(8, row.get(8)?)?,
    })
}

fn parse_stamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt_column(idx, e))
}

fn corrupt_column(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}
