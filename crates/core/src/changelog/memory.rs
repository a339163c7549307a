//! An in-memory [`ChangeLogClient`] fake: a tiny authoritative document store used
//! to drive orchestrator tests without a network.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{ChangeLogClient, ChangeLogError, ChangesSince, PingResult, PutResult, RemoteDocVersion};
use crate::model::{DocumentId, VaultUpdateId};
use crate::path::RelativePath;

struct StoredDoc {
    relative_path: RelativePath,
    content: Vec<u8>,
    version_id: VaultUpdateId,
    is_deleted: bool,
}

#[derive(Clone)]
pub struct MemoryChangeLogClient {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    docs: HashMap<DocumentId, StoredDoc>,
    next_update_id: u64,
    forced_rename: Option<RelativePath>,
    ping_fails: bool,
}

impl Default for MemoryChangeLogClient {
    fn default() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner { docs: HashMap::new(), next_update_id: 1, forced_rename: None, ping_fails: false })) }
    }
}

impl MemoryChangeLogClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: simulate a remote-side change made by some other client,
    /// independent of this client's own `put` calls.
    pub fn seed_remote_change(&self, document_id: DocumentId, relative_path: RelativePath, content: Vec<u8>) -> VaultUpdateId {
        let mut inner = self.inner.lock();
        let version_id = VaultUpdateId(inner.next_update_id);
        inner.next_update_id += 1;
        inner.docs.insert(document_id, StoredDoc { relative_path, content, version_id, is_deleted: false });
        version_id
    }

    pub fn seed_remote_delete(&self, document_id: DocumentId, relative_path: RelativePath) -> VaultUpdateId {
        let mut inner = self.inner.lock();
        let version_id = VaultUpdateId(inner.next_update_id);
        inner.next_update_id += 1;
        inner.docs.insert(document_id, StoredDoc { relative_path, content: Vec::new(), version_id, is_deleted: true });
        version_id
    }

    /// Test helper: the next `put` call is answered with `new_path` as the
    /// authoritative relative path, simulating a server-side rename.
    pub fn force_next_put_rename(&self, new_path: RelativePath) {
        self.inner.lock().forced_rename = Some(new_path);
    }

    /// Test helper: make every subsequent `ping` fail, simulating an unreachable remote.
    pub fn set_ping_failure(&self, fails: bool) {
        self.inner.lock().ping_fails = fails;
    }
}

#[async_trait]
impl ChangeLogClient for MemoryChangeLogClient {
    async fn ping(&self) -> Result<PingResult, ChangeLogError> {
        if self.inner.lock().ping_fails {
            return Err(ChangeLogError::Transport("memory fake configured to fail".into()));
        }
        Ok(PingResult { server_version: "memory-fake/1".into(), is_authenticated: true })
    }

    async fn get_changes_since(&self, cursor: Option<VaultUpdateId>) -> Result<ChangesSince, ChangeLogError> {
        let inner = self.inner.lock();
        let threshold = cursor.map(|c| c.0).unwrap_or(0);
        let mut latest_documents = Vec::new();
        for (id, doc) in inner.docs.iter() {
            if doc.version_id.0 > threshold {
                latest_documents.push(RemoteDocVersion {
                    document_id: *id,
                    relative_path: doc.relative_path.clone(),
                    vault_update_id: doc.version_id,
                    is_deleted: doc.is_deleted,
                    content_bytes: if doc.is_deleted { None } else { Some(doc.content.clone()) },
                });
            }
        }
        latest_documents.sort_by_key(|d| d.vault_update_id.0);
        let last_update_id = latest_documents
            .last()
            .map(|d| d.vault_update_id)
            .unwrap_or_else(|| VaultUpdateId(threshold));
        Ok(ChangesSince { latest_documents, last_update_id })
    }

    async fn get_content(&self, document_id: DocumentId) -> Result<Vec<u8>, ChangeLogError> {
        let inner = self.inner.lock();
        inner
            .docs
            .get(&document_id)
            .filter(|d| !d.is_deleted)
            .map(|d| d.content.clone())
            .ok_or(ChangeLogError::NotFound)
    }

    async fn put(
        &self,
        parent_version_id: Option<VaultUpdateId>,
        relative_path: RelativePath,
        content_bytes: Vec<u8>,
        _created_date: DateTime<Utc>,
    ) -> Result<PutResult, ChangeLogError> {
        let mut inner = self.inner.lock();

        // Find an existing document at this path to treat this as an update.
        let existing_id = inner
            .docs
            .iter()
            .find(|(_, d)| !d.is_deleted && d.relative_path == relative_path)
            .map(|(id, _)| *id);

        let document_id = match existing_id {
            Some(id) => {
                let current_version = inner.docs[&id].version_id;
                if parent_version_id.map(|p| p != current_version).unwrap_or(false) {
                    return Err(ChangeLogError::StaleParent);
                }
                id
            }
            None => DocumentId::new(),
        };

        let version_id = VaultUpdateId(inner.next_update_id);
        inner.next_update_id += 1;
        let response_path = inner.forced_rename.take().unwrap_or(relative_path);
        inner.docs.insert(
            document_id,
            StoredDoc { relative_path: response_path.clone(), content: content_bytes.clone(), version_id, is_deleted: false },
        );

        Ok(PutResult { document_id, version_id, relative_path: response_path, content_bytes })
    }

    async fn delete(&self, document_id: DocumentId, _created_date: DateTime<Utc>) -> Result<(), ChangeLogError> {
        let mut inner = self.inner.lock();
        let version_id = VaultUpdateId(inner.next_update_id);
        inner.next_update_id += 1;
        if let Some(doc) = inner.docs.get_mut(&document_id) {
            doc.is_deleted = true;
            doc.version_id = version_id;
            Ok(())
        } else {
            Err(ChangeLogError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_changes_since_returns_it() {
        let client = MemoryChangeLogClient::new();
        let put = client.put(None, path("a.md"), b"hi".to_vec(), Utc::now()).await.unwrap();
        let changes = client.get_changes_since(None).await.unwrap();
        assert_eq!(changes.latest_documents.len(), 1);
        assert_eq!(changes.latest_documents[0].document_id, put.document_id);
    }

    #[tokio::test]
    async fn stale_parent_is_rejected() {
        let client = MemoryChangeLogClient::new();
        let put = client.put(None, path("a.md"), b"hi".to_vec(), Utc::now()).await.unwrap();
        let result = client
            .put(Some(VaultUpdateId(999)), path("a.md"), b"bye".to_vec(), Utc::now())
            .await;
        assert!(matches!(result, Err(ChangeLogError::StaleParent)));
        let _ = put;
    }

    #[tokio::test]
    async fn cursor_excludes_already_seen_changes() {
        let client = MemoryChangeLogClient::new();
        let put = client.put(None, path("a.md"), b"hi".to_vec(), Utc::now()).await.unwrap();
        let changes = client.get_changes_since(Some(put.version_id)).await.unwrap();
        assert!(changes.latest_documents.is_empty());
    }
}
