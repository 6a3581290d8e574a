//! In-memory turn store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use colloquy_core::error::PersistenceError;
use colloquy_core::{ConversationTurn, SessionId, TurnStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every session's turns in a map. Nothing survives the process.
pub struct InMemoryStore {
    sessions: Arc<RwLock<HashMap<SessionId, Vec<ConversationTurn>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The last `limit` items of `turns`, in their original order.
pub(crate) fn tail(turns: &[ConversationTurn], limit: usize) -> Vec<ConversationTurn> {
    let start = turns.len().saturating_sub(limit);
    turns[start..].to_vec()
}

#[async_trait]
impl TurnStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save_turn(
        &self,
        session: &SessionId,
        turn: &ConversationTurn,
    ) -> Result<(), PersistenceError> {
        self.sessions
            .write()
            .await
            .entry(session.clone())
            .or_default()
            .push(turn.clone());
        Ok(())
    }

    async fn history(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, PersistenceError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session)
            .map(|turns| tail(turns, limit))
            .unwrap_or_default())
    }

    async fn clear_session(&self, session: &SessionId) -> Result<usize, PersistenceError> {
        Ok(self
            .sessions
            .write()
            .await
            .remove(session)
            .map(|turns| turns.len())
            .unwrap_or(0))
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.sessions.read().await.values().map(Vec::len).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: &str) -> ConversationTurn {
        ConversationTurn::new(user, "respuesta", Some("saludo".into()), 0.9, "es")
    }

    #[tokio::test]
    async fn save_and_history() {
        let store = InMemoryStore::new();
        let s = SessionId::from("s1");
        for msg in ["uno", "dos", "tres"] {
            store.save_turn(&s, &turn(msg)).await.unwrap();
        }

        let history = store.history(&s, 2).await.unwrap();
        let users: Vec<&str> = history.iter().map(|t| t.user_message.as_str()).collect();
        assert_eq!(users, vec!["dos", "tres"]);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = InMemoryStore::new();
        let a = SessionId::from("a");
        let b = SessionId::from("b");
        store.save_turn(&a, &turn("hola")).await.unwrap();
        store.save_turn(&b, &turn("hello")).await.unwrap();

        assert_eq!(store.clear_session(&a).await.unwrap(), 1);
        assert!(store.history(&a, 10).await.unwrap().is_empty());
        assert_eq!(store.history(&b, 10).await.unwrap().len(), 1);
        assert_eq!(store.clear_session(&a).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_session_is_empty() {
        let store = InMemoryStore::default();
        assert!(store.history(&SessionId::from("x"), 5).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.name(), "memory");
    }
}
