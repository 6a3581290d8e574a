//! JSON-lines turn store.
//!
//! Each line is one `{"session_id": ..., "turn": {...}}` record. Records are
//! loaded into memory on open. Saving appends a single line; clearing a
//! session rewrites the file without it.

use crate::in_memory::tail;
use async_trait::async_trait;
use colloquy_core::error::PersistenceError;
use colloquy_core::{ConversationTurn, SessionId, TurnStore};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TurnRecord {
    session_id: SessionId,
    turn: ConversationTurn,
}

pub struct JsonlStore {
    path: PathBuf,
    records: Arc<RwLock<Vec<TurnRecord>>>,
}

impl JsonlStore {
    /// Open the store at `path`. A missing file starts empty and is created
    /// on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = records.len(), "Turn log loaded");
        Self {
            path,
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<TurnRecord> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Vec::new();
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<TurnRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted turn record");
                    None
                }
            })
            .collect()
    }

    fn ensure_parent(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Storage(format!("Failed to create turn log directory: {e}"))
            })?;
        }
        Ok(())
    }

    fn append(&self, record: &TurnRecord) -> Result<(), PersistenceError> {
        self.ensure_parent()?;
        let line = serde_json::to_string(record)
            .map_err(|e| PersistenceError::Storage(format!("Failed to serialize turn: {e}")))?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistenceError::Storage(format!("Failed to open turn log: {e}")))?;
        writeln!(file, "{line}")
            .and_then(|_| file.flush())
            .map_err(|e| PersistenceError::Storage(format!("Failed to write turn log: {e}")))
    }

    fn rewrite(&self, records: &[TurnRecord]) -> Result<(), PersistenceError> {
        self.ensure_parent()?;
        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| {
                PersistenceError::Storage(format!("Failed to serialize turn: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }
        std::fs::write(&self.path, content)
            .map_err(|e| PersistenceError::Storage(format!("Failed to write turn log: {e}")))
    }
}

#[async_trait]
impl TurnStore for JsonlStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save_turn(
        &self,
        session: &SessionId,
        turn: &ConversationTurn,
    ) -> Result<(), PersistenceError> {
        let record = TurnRecord {
            session_id: session.clone(),
            turn: turn.clone(),
        };
        let mut records = self.records.write().await;
        self.append(&record)?;
        records.push(record);
        Ok(())
    }

    async fn history(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, PersistenceError> {
        let records = self.records.read().await;
        let turns: Vec<ConversationTurn> = records
            .iter()
            .filter(|r| &r.session_id == session)
            .map(|r| r.turn.clone())
            .collect();
        Ok(tail(&turns, limit))
    }

    async fn clear_session(&self, session: &SessionId) -> Result<usize, PersistenceError> {
        let mut records = self.records.write().await;
        let before = records.len();
        let kept: Vec<TurnRecord> = records
            .iter()
            .filter(|r| &r.session_id != session)
            .cloned()
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.rewrite(&kept)?;
            *records = kept;
        }
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn turn(user: &str) -> ConversationTurn {
        ConversationTurn::new(user, "ok", None, 0.0, "es")
    }

    fn temp_path() -> PathBuf {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_path_buf();
        drop(tmp);
        path
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let path = temp_path();
        let s = SessionId::from("s1");

        let store = JsonlStore::open(&path);
        store.save_turn(&s, &turn("hola")).await.unwrap();
        store.save_turn(&s, &turn("adios")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"session_id\":\"s1\""));

        let reopened = JsonlStore::open(&path);
        let history = reopened.history(&s, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].user_message, "hola");
        assert_eq!(history[1].user_message, "adios");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn clear_session_rewrites_file() {
        let path = temp_path();
        let store = JsonlStore::open(&path);
        let a = SessionId::from("a");
        let b = SessionId::from("b");
        store.save_turn(&a, &turn("uno")).await.unwrap();
        store.save_turn(&b, &turn("dos")).await.unwrap();

        assert_eq!(store.clear_session(&a).await.unwrap(), 1);
        let reopened = JsonlStore::open(&path);
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert!(reopened.history(&a, 10).await.unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn skips_corrupted_lines() {
        let mut tmp = NamedTempFile::new().unwrap();
        let good = serde_json::to_string(&TurnRecord {
            session_id: SessionId::from("s"),
            turn: turn("hola"),
        })
        .unwrap();
        writeln!(tmp, "{good}").unwrap();
        writeln!(tmp, "{{not json").unwrap();
        writeln!(tmp).unwrap();

        let store = JsonlStore::open(tmp.path());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("turns.jsonl");
        let store = JsonlStore::open(&path);
        store
            .save_turn(&SessionId::from("s"), &turn("hola"))
            .await
            .unwrap();
        assert!(path.exists());
        assert_eq!(store.name(), "file");
    }
}
