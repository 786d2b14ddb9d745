mod migrations;

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::task;

use migrations::run_migrations;

/// A session archived into bounded history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedSession {
    pub session_id: String,
    pub user_id: String,
    pub status: String,
    pub archived_at: DateTime<Utc>,
    pub snapshot: String,
}

/// Durable store for serialized session snapshots.
///
/// Saves are full overwrites of the snapshot JSON, not a transactional log.
/// The design assumes a single-process owner; there is no merge or
/// optimistic-concurrency check.
#[derive(Clone)]
pub struct SnapshotStore {
    db: Arc<Mutex<Connection>>,
}

impl SnapshotStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn save_snapshot(
        &self,
        session_id: &str,
        user_id: &str,
        snapshot: &str,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let session_id = session_id.to_owned();
        let user_id = user_id.to_owned();
        let snapshot = snapshot.to_owned();
        let updated_at = now_sql();
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                r#"
                INSERT INTO sessions (session_id, user_id, updated_at, snapshot)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(session_id) DO UPDATE SET
                    user_id = excluded.user_id,
                    updated_at = excluded.updated_at,
                    snapshot = excluded.snapshot
                "#,
                params![session_id, user_id, updated_at, snapshot],
            )?;
            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    pub async fn load_snapshot(&self, session_id: &str) -> Result<Option<String>> {
        let db = Arc::clone(&self.db);
        let session_id = session_id.to_owned();
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let snapshot: Option<String> = conn
                .query_row(
                    "SELECT snapshot FROM sessions WHERE session_id = ?1",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok::<Option<String>, anyhow::Error>(snapshot)
        })
        .await?
    }

    pub async fn delete_snapshot(&self, session_id: &str) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let session_id = session_id.to_owned();
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let deleted = conn.execute(
                "DELETE FROM sessions WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok::<bool, anyhow::Error>(deleted > 0)
        })
        .await?
    }

    /// Move a finished session into history and trim the table down to
    /// `cap` entries, dropping the oldest first.
    pub async fn archive(
        &self,
        session_id: &str,
        user_id: &str,
        status: &str,
        snapshot: &str,
        cap: usize,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let session_id = session_id.to_owned();
        let user_id = user_id.to_owned();
        let status = status.to_owned();
        let snapshot = snapshot.to_owned();
        let archived_at = now_sql();
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            conn.execute(
                r#"
                INSERT INTO session_history (session_id, user_id, status, archived_at, snapshot)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(session_id) DO UPDATE SET
                    status = excluded.status,
                    archived_at = excluded.archived_at,
                    snapshot = excluded.snapshot
                "#,
                params![session_id, user_id, status, archived_at, snapshot],
            )?;
            conn.execute(
                r#"
                DELETE FROM session_history WHERE session_id NOT IN (
                    SELECT session_id FROM session_history
                    ORDER BY archived_at DESC, rowid DESC
                    LIMIT ?1
                )
                "#,
                params![cap as i64],
            )?;
            conn.execute(
                "DELETE FROM sessions WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok::<(), anyhow::Error>(())
        })
        .await??;

        Ok(())
    }

    /// Most-recent-first archived sessions.
    pub async fn recent_history(&self, limit: usize) -> Result<Vec<ArchivedSession>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let mut stmt = conn.prepare(
                r#"
                SELECT session_id, user_id, status, archived_at, snapshot
                FROM session_history
                ORDER BY archived_at DESC, rowid DESC
                LIMIT ?1
                "#,
            )?;
            let rows = stmt.query_map(params![limit as i64], row_to_archived)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok::<Vec<ArchivedSession>, anyhow::Error>(sessions)
        })
        .await?
    }

    /// Age-based cleanup sweep over live snapshots and archived history.
    /// Returns the number of rows removed.
    pub async fn purge_expired(&self, days: i64) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let delta =
            TimeDelta::try_days(days).ok_or_else(|| anyhow!("invalid days value: {days}"))?;
        let cutoff = (Utc::now() - delta).to_rfc3339_opts(SecondsFormat::Micros, true);
        task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| anyhow!("failed to lock sqlite connection"))?;
            let stale_live = conn.execute(
                "DELETE FROM sessions WHERE updated_at < ?1",
                params![cutoff],
            )?;
            let stale_archived = conn.execute(
                "DELETE FROM session_history WHERE archived_at < ?1",
                params![cutoff],
            )?;
            if stale_live + stale_archived > 0 {
                tracing::debug!(stale_live, stale_archived, "purged expired session rows");
            }
            Ok::<usize, anyhow::Error>(stale_live + stale_archived)
        })
        .await?
    }
}

fn now_sql() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime_sql(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_archived(row: &Row<'_>) -> rusqlite::Result<ArchivedSession> {
    let archived_at_raw: String = row.get(3)?;
    Ok(ArchivedSession {
        session_id: row.get(0)?,
        user_id: row.get(1)?,
        status: row.get(2)?,
        archived_at: parse_datetime_sql(&archived_at_raw)?,
        snapshot: row.get(4)?,
    })
}
