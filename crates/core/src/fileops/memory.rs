//! An in-memory [`FileOps`] fake used to drive orchestrator tests without real I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{FileOps, FileOpsError};
use crate::path::RelativePath;

#[derive(Clone, Default)]
pub struct MemoryFileOps {
    files: Arc<Mutex<HashMap<RelativePath, Vec<u8>>>>,
}

impl MemoryFileOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, path: RelativePath, bytes: impl Into<Vec<u8>>) {
        self.files.lock().insert(path, bytes.into());
    }

    pub fn contents(&self, path: &RelativePath) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }
}

#[async_trait]
impl FileOps for MemoryFileOps {
    async fn list_all(&self) -> Result<Vec<RelativePath>, FileOpsError> {
        Ok(self.files.lock().keys().cloned().collect())
    }

    async fn read(&self, path: &RelativePath) -> Result<Vec<u8>, FileOpsError> {
        let files = self.files.lock();
        let bytes = files.get(path).ok_or_else(|| FileOpsError::NotFound(path.clone()))?;
        Ok(normalize_crlf(bytes))
    }

    async fn exists(&self, path: &RelativePath) -> Result<bool, FileOpsError> {
        Ok(self.files.lock().contains_key(path))
    }

    async fn get_file_size(&self, path: &RelativePath) -> Result<u64, FileOpsError> {
        let files = self.files.lock();
        let bytes = files.get(path).ok_or_else(|| FileOpsError::NotFound(path.clone()))?;
        Ok(bytes.len() as u64)
    }

    async fn get_modification_time(&self, path: &RelativePath) -> Result<SystemTime, FileOpsError> {
        if self.files.lock().contains_key(path) {
            Ok(SystemTime::now())
        } else {
            Err(FileOpsError::NotFound(path.clone()))
        }
    }

    async fn create_new(&self, path: &RelativePath, bytes: &[u8]) -> Result<(), FileOpsError> {
        self.files.lock().insert(path.clone(), bytes.to_vec());
        Ok(())
    }

    async fn write_raw(&self, path: &RelativePath, bytes: &[u8]) -> Result<(), FileOpsError> {
        self.files.lock().insert(path.clone(), bytes.to_vec());
        Ok(())
    }

    async fn remove(&self, path: &RelativePath) -> Result<(), FileOpsError> {
        self.files.lock().remove(path);
        Ok(())
    }

    async fn move_path(&self, old: &RelativePath, new: &RelativePath) -> Result<(), FileOpsError> {
        if old == new {
            return Ok(());
        }
        let mut files = self.files.lock();
        if let Some(bytes) = files.remove(old) {
            files.insert(new.clone(), bytes);
        }
        Ok(())
    }
}

fn normalize_crlf(bytes: &[u8]) -> Vec<u8> {
    match std::str::from_utf8(bytes) {
        Ok(s) if s.contains('\r') => s.replace("\r\n", "\n").into_bytes(),
        _ => bytes.to_vec(),
    }
}
