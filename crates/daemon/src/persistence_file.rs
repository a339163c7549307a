//! JSON-file backed [`StatePersistence`], the daemon's real counterpart to
//! `vaultsync_core::persistence::InMemoryPersistence`.

use std::path::PathBuf;

use async_trait::async_trait;
use vaultsync_core::model::PersistedState;
use vaultsync_core::persistence::{PersistenceError, StatePersistence};

pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        let file_name = tmp.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        tmp.set_file_name(format!("{file_name}.tmp"));
        tmp
    }
}

#[async_trait]
impl StatePersistence for FilePersistence {
    async fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => serde_json::from_str(&json).map(Some).map_err(|e| PersistenceError::Load(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Load(e.to_string())),
        }
    }

    async fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| PersistenceError::Save(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|e| PersistenceError::Save(e.to_string()))?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json).await.map_err(|e| PersistenceError::Save(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| PersistenceError::Save(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultsync_core::model::SyncSettings;

    #[tokio::test]
    async fn round_trips_through_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path().join("nested").join("state.json"));

        assert!(persistence.load().await.unwrap().is_none());

        let mut state = PersistedState::default();
        state.settings = SyncSettings { vault_name: "demo".into(), ..Default::default() };
        persistence.save(&state).await.unwrap();

        let loaded = persistence.load().await.unwrap().unwrap();
        assert_eq!(loaded.settings.vault_name, "demo");
    }

    #[tokio::test]
    async fn save_leaves_no_tmp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let persistence = FilePersistence::new(path.clone());
        persistence.save(&PersistedState::default()).await.unwrap();

        assert!(path.exists());
        assert!(!persistence.tmp_path().exists());
    }
}
