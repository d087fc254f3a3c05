use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL,
            grade       TEXT NOT NULL,
            login       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'student'
                        CHECK (role IN ('student', 'director')),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_users_role
            ON users(role, created_at);

        -- No foreign keys: a recipient may be deleted while its messages stay.
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            sender_id       TEXT NOT NULL,
            recipient_id    TEXT NOT NULL,
            text            TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'sent'
                            CHECK (status IN ('sent', 'read')),
            created_at      TEXT NOT NULL,
            CHECK (sender_id <> recipient_id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_recipient_status
            ON messages(recipient_id, status);

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, recipient_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
