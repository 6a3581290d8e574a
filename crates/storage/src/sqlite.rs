//! SQLite turn store.
//!
//! A single `turns` table holds every session's history, indexed by
//! `(session_id, timestamp)` so per-session reads stay cheap.

use async_trait::async_trait;
use chrono::Utc;
use colloquy_core::error::PersistenceError;
use colloquy_core::{ConversationTurn, SessionId, TurnStore};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// `sqlite::memory:` gives an ephemeral database; it is limited to one
    /// connection so every query sees the same data.
    pub async fn new(path: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| PersistenceError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let max_connections = if path.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| PersistenceError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite turn store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, PersistenceError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                iid          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id   TEXT NOT NULL,
                user_message TEXT NOT NULL,
                bot_response TEXT NOT NULL,
                intent       TEXT,
                confidence   REAL NOT NULL DEFAULT 0.0,
                language     TEXT NOT NULL,
                timestamp    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::MigrationFailed(format!("turns table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turns_session_time ON turns(session_id, timestamp)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::MigrationFailed(format!("session index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationTurn, PersistenceError> {
        let user_message: String = row
            .try_get("user_message")
            .map_err(|e| PersistenceError::QueryFailed(format!("user_message column: {e}")))?;
        let bot_response: String = row
            .try_get("bot_response")
            .map_err(|e| PersistenceError::QueryFailed(format!("bot_response column: {e}")))?;
        let intent: Option<String> = row
            .try_get("intent")
            .map_err(|e| PersistenceError::QueryFailed(format!("intent column: {e}")))?;
        let confidence: f64 = row.try_get("confidence").unwrap_or(0.0);
        let language: String = row
            .try_get("language")
            .map_err(|e| PersistenceError::QueryFailed(format!("language column: {e}")))?;
        let timestamp_str: String = row
            .try_get("timestamp")
            .map_err(|e| PersistenceError::QueryFailed(format!("timestamp column: {e}")))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(ConversationTurn {
            user_message,
            bot_response,
            intent,
            confidence: confidence as f32,
            language,
            timestamp,
        })
    }
}

#[async_trait]
impl TurnStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn save_turn(
        &self,
        session: &SessionId,
        turn: &ConversationTurn,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO turns (session_id, user_message, bot_response, intent, confidence, language, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(session.as_str())
        .bind(&turn.user_message)
        .bind(&turn.bot_response)
        .bind(&turn.intent)
        .bind(f64::from(turn.confidence))
        .bind(&turn.language)
        .bind(turn.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PersistenceError::Storage(format!("INSERT failed: {e}")))?;

        Ok(())
    }

    async fn history(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM (
                SELECT * FROM turns WHERE session_id = ?1
                ORDER BY iid DESC
                LIMIT ?2
            ) ORDER BY iid ASC
            "#,
        )
        .bind(session.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PersistenceError::QueryFailed(format!("history: {e}")))?;

        rows.iter().map(Self::row_to_turn).collect()
    }

    async fn clear_session(&self, session: &SessionId) -> Result<usize, PersistenceError> {
        let result = sqlx::query("DELETE FROM turns WHERE session_id = ?1")
            .bind(session.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() as usize)
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM turns")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PersistenceError::QueryFailed(format!("COUNT: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| PersistenceError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as usize)
    }
}
