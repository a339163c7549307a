//! In-memory metadata map with write-through persistence (`SPEC_FULL.md` §4.6).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{DocumentMetadata, PersistedState, SyncSettings, VaultUpdateId};
use crate::path::RelativePath;
use crate::persistence::{PersistenceError, StatePersistence};

type SettingsListener = Box<dyn Fn(&SyncSettings) + Send + Sync>;

pub struct MetadataStore {
    state: RwLock<PersistedState>,
    persistence: Arc<dyn StatePersistence>,
    settings_listeners: RwLock<Vec<SettingsListener>>,
}

impl MetadataStore {
    pub async fn load(persistence: Arc<dyn StatePersistence>) -> Result<Self, PersistenceError> {
        let state = persistence.load().await?.unwrap_or_default();
        Ok(Self { state: RwLock::new(state), persistence, settings_listeners: RwLock::new(Vec::new()) })
    }

    pub fn get(&self, path: &RelativePath) -> Option<DocumentMetadata> {
        self.state.read().documents.get(path).cloned()
    }

    pub fn settings(&self) -> SyncSettings {
        self.state.read().settings.clone()
    }

    pub fn last_seen_update_id(&self) -> Option<VaultUpdateId> {
        self.state.read().last_seen_update_id
    }

    /// Reverse lookup: the path currently associated with a remote document id, if
    /// any metadata entry tracks it.
    pub fn path_for_document_id(&self, document_id: crate::model::DocumentId) -> Option<RelativePath> {
        self.state
            .read()
            .documents
            .iter()
            .find(|(_, meta)| meta.document_id == document_id)
            .map(|(path, _)| path.clone())
    }

    pub async fn set(&self, path: RelativePath, metadata: DocumentMetadata) -> Result<(), PersistenceError> {
        {
            let mut state = self.state.write();
            state.documents.insert(path, metadata);
        }
        self.persist().await
    }

    pub async fn remove(&self, path: &RelativePath) -> Result<(), PersistenceError> {
        {
            let mut state = self.state.write();
            state.documents.remove(path);
        }
        self.persist().await
    }

    /// Renames a metadata entry's key without touching its value.
    pub async fn rename(&self, old: &RelativePath, new: RelativePath) -> Result<(), PersistenceError> {
        {
            let mut state = self.state.write();
            if let Some(metadata) = state.documents.remove(old) {
                state.documents.insert(new, metadata);
            }
        }
        self.persist().await
    }

    pub async fn advance_cursor(&self, update_id: VaultUpdateId) -> Result<(), PersistenceError> {
        {
            let mut state = self.state.write();
            state.last_seen_update_id = Some(update_id);
        }
        self.persist().await
    }

    /// Replaces the settings, synchronously notifying listeners before the new
    /// state is persisted so a listener-driven restart (e.g. the pull timer)
    /// observes the new cadence atomically with the saved state.
    pub async fn update_settings(&self, settings: SyncSettings) -> Result<(), PersistenceError> {
        {
            let mut state = self.state.write();
            state.settings = settings.clone();
        }
        for listener in self.settings_listeners.read().iter() {
            listener(&settings);
        }
        self.persist().await
    }

    /// Clears all metadata and the cursor; settings are preserved. Used by the
    /// client facade's `reset_sync_state` operation.
    pub async fn reset(&self) -> Result<(), PersistenceError> {
        {
            let mut state = self.state.write();
            state.documents.clear();
            state.last_seen_update_id = None;
        }
        self.persist().await
    }

    pub fn add_settings_change_listener(&self, listener: impl Fn(&SyncSettings) + Send + Sync + 'static) {
        self.settings_listeners.write().push(Box::new(listener));
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let snapshot = self.state.read().clone();
        self.persistence.save(&snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ContentHash;
    use crate::model::DocumentId;
    use crate::persistence::InMemoryPersistence;

    fn path(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn round_trip_persistence() {
        let persistence: Arc<dyn StatePersistence> = Arc::new(InMemoryPersistence::new());
        let store = MetadataStore::load(persistence.clone()).await.unwrap();
        store
            .set(
                path("a.md"),
                DocumentMetadata { document_id: DocumentId::new(), parent_version_id: VaultUpdateId(1), hash: ContentHash::of(b"x") },
            )
            .await
            .unwrap();

        let reloaded = MetadataStore::load(persistence).await.unwrap();
        assert!(reloaded.get(&path("a.md")).is_some());
    }

    #[tokio::test]
    async fn cursor_monotonic_except_reset() {
        let persistence: Arc<dyn StatePersistence> = Arc::new(InMemoryPersistence::new());
        let store = MetadataStore::load(persistence).await.unwrap();
        store.advance_cursor(VaultUpdateId(5)).await.unwrap();
        store.advance_cursor(VaultUpdateId(10)).await.unwrap();
        assert_eq!(store.last_seen_update_id(), Some(VaultUpdateId(10)));
        store.reset().await.unwrap();
        assert_eq!(store.last_seen_update_id(), None);
    }

    #[tokio::test]
    async fn settings_listener_fires_before_save_returns() {
        let persistence: Arc<dyn StatePersistence> = Arc::new(InMemoryPersistence::new());
        let store = MetadataStore::load(persistence).await.unwrap();
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let seen_clone = seen.clone();
        store.add_settings_change_listener(move |s| *seen_clone.lock() = Some(s.vault_name.clone()));

        store
            .update_settings(SyncSettings { vault_name: "demo".into(), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(seen.lock().as_deref(), Some("demo"));
    }
}
