// Ledger store: account links and drop log (SQLite via sqlx).

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;

/// Most drops returned by a single history query.
pub const DROP_HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0} is already linked")]
    DuplicateLink(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountLink {
    pub id: i64,
    pub caller_id: String,
    pub rsn: String,
    pub linked_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DropEvent {
    pub id: i64,
    pub caller_id: String,
    pub rsn: String,
    pub item_name: String,
    pub timestamp: String,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Every connection to `sqlite::memory:` opens its own empty database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS linked_accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                caller_id TEXT NOT NULL,
                rsn TEXT NOT NULL,
                linked_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(caller_id, rsn)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS drop_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                caller_id TEXT NOT NULL,
                rsn TEXT NOT NULL,
                item_name TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // Reserved: nothing reads or writes the two tables below yet.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS achievement_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                caller_id TEXT NOT NULL,
                rsn TEXT NOT NULL,
                achievement_type TEXT NOT NULL,
                achievement_detail TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS player_cache (
                rsn TEXT PRIMARY KEY,
                total_xp INTEGER,
                last_activity TEXT,
                last_updated TEXT
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── Account links ────────────────────────────────────────────────

    /// Store a link for `rsn`, which should already be the canonical name.
    pub async fn link_account(&self, caller_id: &str, rsn: &str) -> Result<AccountLink, LedgerError> {
        let result = sqlx::query_as::<_, AccountLink>(
            "INSERT INTO linked_accounts (caller_id, rsn) VALUES (?, ?) RETURNING id, caller_id, rsn, linked_at",
        )
        .bind(caller_id)
        .bind(rsn)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(link) => Ok(link),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(LedgerError::DuplicateLink(rsn.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the caller's links whose name matches `rsn` case-insensitively.
    /// Returns the number of rows removed.
    pub async fn unlink_account(&self, caller_id: &str, rsn: &str) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM linked_accounts WHERE caller_id = ? AND LOWER(rsn) = LOWER(?)")
                .bind(caller_id)
                .bind(rsn)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_links(&self, caller_id: &str) -> Result<Vec<AccountLink>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AccountLink>(
            "SELECT id, caller_id, rsn, linked_at FROM linked_accounts WHERE caller_id = ? ORDER BY linked_at, id",
        )
        .bind(caller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Every distinct linked name across all callers, oldest link first.
    pub async fn distinct_linked_names(&self) -> Result<Vec<String>, sqlx::Error> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT rsn FROM linked_accounts GROUP BY rsn ORDER BY MIN(id)",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    // ── Drop log ─────────────────────────────────────────────────────

    /// Append a drop. Ownership of `rsn` is checked by the caller.
    pub async fn record_drop(
        &self,
        caller_id: &str,
        rsn: &str,
        item_name: &str,
    ) -> Result<DropEvent, sqlx::Error> {
        let row = sqlx::query_as::<_, DropEvent>(
            "INSERT INTO drop_log (caller_id, rsn, item_name) VALUES (?, ?, ?) RETURNING id, caller_id, rsn, item_name, timestamp",
        )
        .bind(caller_id)
        .bind(rsn)
        .bind(item_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Newest drops first, at most [`DROP_HISTORY_LIMIT`], optionally for one name.
    pub async fn list_drops(&self, rsn: Option<&str>) -> Result<Vec<DropEvent>, sqlx::Error> {
        let rows = match rsn {
            Some(rsn) => {
                sqlx::query_as::<_, DropEvent>(
                    "SELECT id, caller_id, rsn, item_name, timestamp FROM drop_log WHERE LOWER(rsn) = LOWER(?) ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(rsn)
                .bind(DROP_HISTORY_LIMIT)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DropEvent>(
                    "SELECT id, caller_id, rsn, item_name, timestamp FROM drop_log ORDER BY timestamp DESC, id DESC LIMIT ?",
                )
                .bind(DROP_HISTORY_LIMIT)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }
}
