use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            referral_id     INTEGER NOT NULL,
            sender_id       TEXT NOT NULL,
            recipient_id    TEXT,
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            read            INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_referral
            ON messages(referral_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(recipient_id, read);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
