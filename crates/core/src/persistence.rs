//! Injected load/save pair for [`crate::model::PersistedState`].
//!
//! The engine treats persistence as a single opaque blob: hosts decide where it
//! lives (a JSON file, a key-value store, browser local storage) and hand in a
//! trait implementation; the metadata store only calls `load`/`save`.

use async_trait::async_trait;

use crate::model::PersistedState;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to load persisted state: {0}")]
    Load(String),
    #[error("failed to save persisted state: {0}")]
    Save(String),
}

#[async_trait]
pub trait StatePersistence: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError>;
    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// An in-memory persistence backend: round-trips through `serde_json` the same way
/// a file-backed implementation would, without touching disk. Useful both for tests
/// and as the default when a host has nowhere durable to put state yet.
#[derive(Default)]
pub struct InMemoryPersistence {
    blob: parking_lot::Mutex<Option<String>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatePersistence for InMemoryPersistence {
    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        let blob = self.blob.lock();
        match blob.as_ref() {
            None => Ok(None),
            Some(json) => serde_json::from_str(json).map(Some).map_err(|e| PersistenceError::Load(e.to_string())),
        }
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state).map_err(|e| PersistenceError::Save(e.to_string()))?;
        *self.blob.lock() = Some(json);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncSettings;

    #[tokio::test]
    async fn round_trips_through_json() {
        let persistence = InMemoryPersistence::new();
        let mut state = PersistedState::default();
        state.settings = SyncSettings { vault_name: "demo".into(), ..Default::default() };
        persistence.save(&state).await.unwrap();
        let loaded = persistence.load().await.unwrap().unwrap();
        assert_eq!(loaded.settings.vault_name, "demo");
    }

    #[tokio::test]
    async fn load_before_any_save_is_none() {
        let persistence = InMemoryPersistence::new();
        assert!(persistence.load().await.unwrap().is_none());
    }
}
