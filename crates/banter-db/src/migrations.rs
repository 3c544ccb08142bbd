use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            kind        TEXT NOT NULL CHECK (kind IN ('private', 'room')),
            sender      TEXT NOT NULL,
            receiver    TEXT,
            room        TEXT,
            content     TEXT NOT NULL,
            seen        INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_private
            ON messages(kind, sender, receiver, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON messages(kind, room, created_at);
        ",
    )?;

    info!("message store migrations complete");
    Ok(())
}
