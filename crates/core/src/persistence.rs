//! TurnStore trait: where resolved turns are persisted.
//!
//! Persistence is a sink: the engine saves every resolved turn and logs any
//! failure without letting it block the reply.

use crate::error::PersistenceError;
use crate::message::{ConversationTurn, SessionId};
use async_trait::async_trait;

/// The core TurnStore trait.
///
/// Implementations: in-memory (for testing), JSONL file, SQLite.
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// The backend name (e.g., "memory", "file", "sqlite").
    fn name(&self) -> &str;

    /// Append a turn to a session's history.
    async fn save_turn(
        &self,
        session: &SessionId,
        turn: &ConversationTurn,
    ) -> std::result::Result<(), PersistenceError>;

    /// The most recent `limit` turns of a session, oldest first.
    async fn history(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> std::result::Result<Vec<ConversationTurn>, PersistenceError>;

    /// Delete a session's history. Returns how many turns were removed.
    async fn clear_session(&self, session: &SessionId)
    -> std::result::Result<usize, PersistenceError>;

    /// Total number of stored turns across all sessions.
    async fn count(&self) -> std::result::Result<usize, PersistenceError>;
}
