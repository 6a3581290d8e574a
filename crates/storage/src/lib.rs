//! Turn persistence backends for Colloquy.

pub mod file_backend;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::JsonlStore;
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use colloquy_config::EngineConfig;
use colloquy_core::TurnStore;
use colloquy_core::error::PersistenceError;
use std::sync::Arc;

/// Build the store named by `persistence.backend`. `none` disables
/// persistence and yields `Ok(None)`.
pub async fn from_config(
    config: &EngineConfig,
) -> Result<Option<Arc<dyn TurnStore>>, PersistenceError> {
    let store: Arc<dyn TurnStore> = match config.persistence.backend.as_str() {
        "none" => return Ok(None),
        "memory" => Arc::new(InMemoryStore::new()),
        "file" => Arc::new(JsonlStore::open(config.persistence_path())),
        "sqlite" => open_sqlite(config).await?,
        other => {
            return Err(PersistenceError::Storage(format!(
                "unknown persistence backend: {other}"
            )));
        }
    };
    tracing::debug!(backend = store.name(), "Turn store ready");
    Ok(Some(store))
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(config: &EngineConfig) -> Result<Arc<dyn TurnStore>, PersistenceError> {
    let path = config.persistence_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            PersistenceError::Storage(format!("Failed to create database directory: {e}"))
        })?;
    }
    let url = format!("sqlite://{}", path.display());
    Ok(Arc::new(SqliteStore::new(&url).await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_config: &EngineConfig) -> Result<Arc<dyn TurnStore>, PersistenceError> {
    Err(PersistenceError::Storage(
        "built without the `sqlite` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_disables_persistence() {
        let mut config = EngineConfig::default();
        config.persistence.backend = "none".into();
        assert!(from_config(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_is_in_memory() {
        let store = from_config(&EngineConfig::default()).await.unwrap().unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn file_backend_uses_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.persistence.backend = "file".into();
        config.persistence.path = Some(dir.path().join("turns.jsonl"));
        let store = from_config(&config).await.unwrap().unwrap();
        assert_eq!(store.name(), "file");
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn sqlite_backend_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.persistence.backend = "sqlite".into();
        config.persistence.path = Some(dir.path().join("db").join("turns.db"));
        let store = from_config(&config).await.unwrap().unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(dir.path().join("db").join("turns.db").exists());
    }

    #[tokio::test]
    async fn unknown_backend_is_an_error() {
        let mut config = EngineConfig::default();
        config.persistence.backend = "redis".into();
        assert!(from_config(&config).await.is_err());
    }
}
