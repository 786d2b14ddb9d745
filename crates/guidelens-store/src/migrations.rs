use anyhow::Result;
use rusqlite::Connection;

/// Schema version recorded in `meta`. Bump when adding a migration step.
const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            snapshot TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_history (
            session_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            status TEXT NOT NULL,
            archived_at TEXT NOT NULL,
            snapshot TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_archived_at
            ON session_history(archived_at DESC);
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
