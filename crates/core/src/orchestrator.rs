//! Sync orchestrator (`SPEC_FULL.md` §4.5): push/pull state machine, per-path
//! mutual exclusion, and the outermost error-catch boundary (§7) — nothing below
//! this module surfaces a fault to the host as a `Result`; every task terminates
//! here as a [`HistoryEntry`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;

use crate::binary::{self, NativeLineEndings};
use crate::changelog::{ChangeLogClient, ChangeLogError, RemoteDocVersion};
use crate::fileops::FileOps;
use crate::hash::ContentHash;
use crate::history::SharedHistory;
use crate::lock::LockTable;
use crate::metadata_store::MetadataStore;
use crate::model::{ConnectionStatus, DocumentMetadata, HistoryEntry, HistoryOpType, HistorySource, HistoryStatus};
use crate::path::RelativePath;
use crate::reconcile::merge_text;

type PendingOpsListener = Box<dyn Fn(usize) + Send + Sync>;

pub struct Orchestrator<F, C> {
    fs: Arc<F>,
    changelog: Arc<C>,
    locks: LockTable,
    metadata: Arc<MetadataStore>,
    history: SharedHistory,
    pull_running: AtomicBool,
    native_line_endings: NativeLineEndings,
    pending_ops: AtomicUsize,
    pending_ops_listeners: RwLock<Vec<PendingOpsListener>>,
}

impl<F, C> Orchestrator<F, C>
where
    F: FileOps,
    C: ChangeLogClient,
{
    pub fn new(fs: Arc<F>, changelog: Arc<C>, metadata: Arc<MetadataStore>, history: SharedHistory, native_line_endings: NativeLineEndings) -> Self {
        Self {
            fs,
            changelog,
            locks: LockTable::new(),
            metadata,
            history,
            pull_running: AtomicBool::new(false),
            native_line_endings,
            pending_ops: AtomicUsize::new(0),
            pending_ops_listeners: RwLock::new(Vec::new()),
        }
    }

    /// One-shot reachability probe, backed by the change-log `ping` endpoint. There is
    /// no separate WebSocket transport in this engine, so `is_web_socket_connected`
    /// always mirrors `is_successful`.
    pub async fn check_connection(&self) -> ConnectionStatus {
        match self.changelog.ping().await {
            Ok(result) => ConnectionStatus {
                is_successful: true,
                is_web_socket_connected: true,
                server_message: format!("connected, server version {}", result.server_version),
            },
            Err(e) => ConnectionStatus { is_successful: false, is_web_socket_connected: false, server_message: e.to_string() },
        }
    }

    pub fn add_pending_ops_listener(&self, listener: impl Fn(usize) + Send + Sync + 'static) {
        self.pending_ops_listeners.write().push(Box::new(listener));
    }

    pub fn pending_ops(&self) -> usize {
        self.pending_ops.load(Ordering::SeqCst)
    }

    fn enter_op(&self) {
        let count = self.pending_ops.fetch_add(1, Ordering::SeqCst) + 1;
        self.notify_pending(count);
    }

    fn exit_op(&self) {
        let count = self.pending_ops.fetch_sub(1, Ordering::SeqCst) - 1;
        self.notify_pending(count);
    }

    fn notify_pending(&self, count: usize) {
        for listener in self.pending_ops_listeners.read().iter() {
            listener(count);
        }
    }

    /// Push path: local event -> remote. Acquires the per-path lock for the whole
    /// operation and never lets an error escape; failures become history entries.
    pub async fn push(&self, path: RelativePath) {
        self.enter_op();
        let handle = self.locks.wait_for_lock(path.clone()).await;
        if let Err(e) = self.push_locked(&path).await {
            tracing::error!(relative_path = %path, "push failed: {e}");
        }
        let _ = self.locks.release(handle);
        self.exit_op();
    }

    async fn push_locked(&self, path: &RelativePath) -> Result<(), ChangeLogError> {
        if !self.fs.exists(path).await.map_err(|e| ChangeLogError::Transport(e.to_string()))? {
            self.record(path, HistorySource::Push, HistoryOpType::Update, HistoryStatus::NoOp, "path vanished before push");
            return Ok(());
        }

        let current = self.fs.read(path).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
        let hash = ContentHash::of(&current);
        let existing = self.metadata.get(path);

        if let Some(meta) = &existing {
            if meta.hash == hash {
                self.record(path, HistorySource::Push, HistoryOpType::Update, HistoryStatus::NoOp, "unchanged since last sync");
                return Ok(());
            }
        }

        let parent_version_id = existing.as_ref().map(|m| m.parent_version_id);
        let op_type = if existing.is_some() { HistoryOpType::Update } else { HistoryOpType::Create };

        let put_result = match crate::changelog::retry_with_backoff(|| {
            self.changelog.put(parent_version_id, path.clone(), current.clone(), Utc::now())
        })
        .await
        {
            Ok(r) => r,
            Err(ChangeLogError::StaleParent) => {
                self.record(path, HistorySource::Push, op_type, HistoryStatus::Error, "stale parent; retrying after next pull");
                return Ok(());
            }
            Err(e) => {
                self.record(path, HistorySource::Push, op_type, HistoryStatus::Error, &e.to_string());
                return Err(e);
            }
        };

        let mut final_path = path.clone();
        if put_result.relative_path != *path {
            self.fs.move_path(path, &put_result.relative_path).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
            self.metadata.rename(path, put_result.relative_path.clone()).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
            final_path = put_result.relative_path.clone();
        }

        let fresh_disk_bytes = self.fs.read(&final_path).await.unwrap_or_default();
        let final_bytes = if fresh_disk_bytes != current {
            if !binary::is_text(&fresh_disk_bytes) || !binary::is_text(&put_result.content_bytes) {
                self.fs
                    .write_raw(&final_path, &put_result.content_bytes)
                    .await
                    .map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                put_result.content_bytes.clone()
            } else {
                let sent = String::from_utf8_lossy(&current);
                let fresh = String::from_utf8_lossy(&fresh_disk_bytes);
                let response = String::from_utf8_lossy(&put_result.content_bytes);
                let merged = merge_text(&sent, &fresh, &response);
                let disk_bytes = binary::to_native_line_endings(merged.as_bytes(), self.native_line_endings);
                self.fs
                    .write_raw(&final_path, &disk_bytes)
                    .await
                    .map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                merged.into_bytes()
            }
        } else {
            put_result.content_bytes.clone()
        };

        self.metadata
            .set(
                final_path.clone(),
                DocumentMetadata {
                    document_id: put_result.document_id,
                    parent_version_id: put_result.version_id,
                    hash: ContentHash::of(&final_bytes),
                },
            )
            .await
            .map_err(|e| ChangeLogError::Transport(e.to_string()))?;

        self.record(&final_path, HistorySource::Push, op_type, HistoryStatus::Success, "pushed");
        Ok(())
    }

    pub async fn delete(&self, path: RelativePath) {
        self.enter_op();
        let handle = self.locks.wait_for_lock(path.clone()).await;
        if let Err(e) = self.delete_locked(&path).await {
            tracing::error!(relative_path = %path, "delete failed: {e}");
        }
        let _ = self.locks.release(handle);
        self.exit_op();
    }

    async fn delete_locked(&self, path: &RelativePath) -> Result<(), ChangeLogError> {
        let Some(meta) = self.metadata.get(path) else {
            self.record(path, HistorySource::Push, HistoryOpType::Delete, HistoryStatus::NoOp, "no metadata for path");
            return Ok(());
        };

        if let Err(e) = crate::changelog::retry_with_backoff(|| self.changelog.delete(meta.document_id, Utc::now())).await {
            self.record(path, HistorySource::Push, HistoryOpType::Delete, HistoryStatus::Error, &e.to_string());
            return Err(e);
        }

        self.metadata.remove(path).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
        self.record(path, HistorySource::Push, HistoryOpType::Delete, HistoryStatus::Success, "deleted");
        Ok(())
    }

    /// Treated as delete+create only when `old` has metadata and `new` does not
    /// (the old document is gone, `new` is pushed fresh); otherwise treated as an
    /// update at `new` carrying `old`'s identity and parent version forward.
    pub async fn rename(&self, old: RelativePath, new: RelativePath) {
        let old_handle = self.locks.wait_for_lock(old.clone()).await;
        let old_meta = self.metadata.get(&old);
        let has_new = self.metadata.get(&new).is_some();

        if let Some(meta) = &old_meta {
            if !has_new {
                if let Err(e) = crate::changelog::retry_with_backoff(|| self.changelog.delete(meta.document_id, Utc::now())).await {
                    tracing::error!(relative_path = %old, "rename delete failed: {e}");
                }
                if let Err(e) = self.metadata.remove(&old).await {
                    tracing::error!(relative_path = %old, "metadata remove failed: {e}");
                }
            } else if let Err(e) = self.metadata.rename(&old, new.clone()).await {
                tracing::error!(relative_path = %new, "metadata rename failed: {e}");
            }
        }
        let _ = self.locks.release(old_handle);

        self.push(new).await;
    }

    /// Runs one pull cycle if none is already in flight. The cursor advances only
    /// after every entry in the batch has settled.
    pub async fn run_pull_cycle(&self) {
        if self.pull_running.swap(true, Ordering::SeqCst) {
            tracing::debug!("pull cycle already running, skipping");
            return;
        }
        if let Err(e) = self.run_pull_cycle_inner().await {
            tracing::error!("pull cycle failed: {e}");
        }
        self.pull_running.store(false, Ordering::SeqCst);
    }

    async fn run_pull_cycle_inner(&self) -> Result<(), ChangeLogError> {
        let cursor = self.metadata.last_seen_update_id();
        let changes = self.changelog.get_changes_since(cursor).await?;
        let concurrency = self.metadata.settings().upload_concurrency.max(1);

        stream::iter(changes.latest_documents)
            .for_each_concurrent(concurrency, |doc| async move {
                self.apply_pull_entry(doc).await;
            })
            .await;

        self.metadata
            .advance_cursor(changes.last_update_id)
            .await
            .map_err(|e| ChangeLogError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn apply_pull_entry(&self, doc: RemoteDocVersion) {
        let path = self
            .metadata
            .path_for_document_id(doc.document_id)
            .unwrap_or_else(|| doc.relative_path.clone());
        let handle = self.locks.wait_for_lock(path.clone()).await;
        if let Err(e) = self.apply_pull_entry_locked(&path, doc).await {
            tracing::error!(relative_path = %path, "pull entry failed: {e}");
        }
        let _ = self.locks.release(handle);
    }

    async fn apply_pull_entry_locked(&self, path: &RelativePath, doc: RemoteDocVersion) -> Result<(), ChangeLogError> {
        let local_meta = self.metadata.get(path);

        match (local_meta, doc.is_deleted) {
            (None, true) => {
                self.record(path, HistorySource::Pull, HistoryOpType::Delete, HistoryStatus::NoOp, "remote delete, no local metadata");
                Ok(())
            }
            (None, false) => {
                let content = match doc.content_bytes {
                    Some(bytes) => bytes,
                    None => self.changelog.get_content(doc.document_id).await?,
                };
                let disk_bytes = binary::to_native_line_endings(&content, self.native_line_endings);
                self.fs.create(path, &disk_bytes).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                self.metadata
                    .set(
                        path.clone(),
                        DocumentMetadata { document_id: doc.document_id, parent_version_id: doc.vault_update_id, hash: ContentHash::of(&content) },
                    )
                    .await
                    .map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                self.record(path, HistorySource::Pull, HistoryOpType::Create, HistoryStatus::Success, "created from remote");
                Ok(())
            }
            (Some(_), true) => {
                self.fs.remove(path).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                self.metadata.remove(path).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                self.record(path, HistorySource::Pull, HistoryOpType::Delete, HistoryStatus::Success, "deleted by remote");
                Ok(())
            }
            (Some(meta), false) => {
                let current = self.fs.read(path).await.unwrap_or_default();
                if ContentHash::of(&current) != meta.hash {
                    self.record(path, HistorySource::Pull, HistoryOpType::Update, HistoryStatus::NoOp, "local diverged, skipping pull");
                    return Ok(());
                }

                let mut target_path = path.clone();
                if doc.relative_path != *path {
                    self.fs.move_path(path, &doc.relative_path).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                    self.metadata.rename(path, doc.relative_path.clone()).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                    target_path = doc.relative_path.clone();
                }

                let remote_bytes = match doc.content_bytes {
                    Some(bytes) => bytes,
                    None => self.changelog.get_content(doc.document_id).await?,
                };
                let final_bytes = self
                    .fs
                    .write(&target_path, &current, &remote_bytes)
                    .await
                    .map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                let disk_bytes = binary::to_native_line_endings(&final_bytes, self.native_line_endings);
                if disk_bytes != final_bytes {
                    self.fs.write_raw(&target_path, &disk_bytes).await.map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                }
                self.metadata
                    .set(
                        target_path.clone(),
                        DocumentMetadata { document_id: doc.document_id, parent_version_id: doc.vault_update_id, hash: ContentHash::of(&final_bytes) },
                    )
                    .await
                    .map_err(|e| ChangeLogError::Transport(e.to_string()))?;
                self.record(&target_path, HistorySource::Pull, HistoryOpType::Update, HistoryStatus::Success, "updated from remote");
                Ok(())
            }
        }
    }

    fn record(&self, path: &RelativePath, source: HistorySource, op_type: HistoryOpType, status: HistoryStatus, message: &str) {
        let level = match status {
            HistoryStatus::Error => crate::history::LogLevel::Error,
            HistoryStatus::NoOp => crate::history::LogLevel::Debug,
            HistoryStatus::Success => crate::history::LogLevel::Info,
        };
        self.history.append(HistoryEntry {
            timestamp: Utc::now(),
            relative_path: path.clone(),
            source,
            op_type,
            status,
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::MemoryChangeLogClient;
    use crate::fileops::MemoryFileOps;
    use crate::history::{History, HistoryConfig};
    use crate::model::SyncSettings;
    use crate::persistence::InMemoryPersistence;

    async fn new_orchestrator() -> (Orchestrator<MemoryFileOps, MemoryChangeLogClient>, MemoryFileOps, MemoryChangeLogClient, Arc<MetadataStore>) {
        let fs = MemoryFileOps::new();
        let changelog = MemoryChangeLogClient::new();
        let metadata = Arc::new(MetadataStore::load(Arc::new(InMemoryPersistence::new())).await.unwrap());
        metadata.update_settings(SyncSettings { upload_concurrency: 4, ..Default::default() }).await.unwrap();
        let history = Arc::new(History::new(HistoryConfig::default()));
        let orch = Orchestrator::new(Arc::new(fs.clone()), Arc::new(changelog.clone()), metadata.clone(), history, crate::binary::NativeLineEndings::Lf);
        (orch, fs, changelog, metadata)
    }

    fn path(s: &str) -> RelativePath {
        RelativePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn no_change_push_is_no_op() {
        let (orch, fs, changelog, metadata) = new_orchestrator().await;
        fs.create(&path("a.md"), b"hello").await.unwrap();
        orch.push(path("a.md")).await;
        // second push with identical content should be a no-op (no second remote doc created)
        orch.push(path("a.md")).await;
        let changes = changelog.get_changes_since(None).await.unwrap();
        assert_eq!(changes.latest_documents.len(), 1);
        assert!(metadata.get(&path("a.md")).is_some());
    }

    #[tokio::test]
    async fn pull_of_remote_delete_removes_local_file() {
        let (orch, fs, changelog, metadata) = new_orchestrator().await;
        fs.create(&path("a.md"), b"hello").await.unwrap();
        orch.push(path("a.md")).await;
        let doc_id = metadata.get(&path("a.md")).unwrap().document_id;

        changelog.seed_remote_delete(doc_id, path("a.md"));
        orch.run_pull_cycle().await;

        assert!(fs.contents(&path("a.md")).is_none());
        assert!(metadata.get(&path("a.md")).is_none());
    }

    #[tokio::test]
    async fn pull_skips_entry_when_local_diverged() {
        let (orch, fs, changelog, metadata) = new_orchestrator().await;
        fs.create(&path("a.md"), b"hello").await.unwrap();
        orch.push(path("a.md")).await;
        let meta = metadata.get(&path("a.md")).unwrap();

        // Local edit happens without a push yet.
        fs.write_raw(&path("a.md"), b"hello local edit").await.unwrap();

        changelog.seed_remote_change(meta.document_id, path("a.md"), b"hello remote edit".to_vec());
        orch.run_pull_cycle().await;

        // Local file must be untouched; metadata must not have advanced.
        assert_eq!(fs.contents(&path("a.md")).unwrap(), b"hello local edit");
        assert_eq!(metadata.get(&path("a.md")).unwrap().parent_version_id, meta.parent_version_id);
    }

    #[tokio::test]
    async fn rename_without_new_metadata_deletes_old_and_creates_fresh() {
        let (orch, fs, changelog, metadata) = new_orchestrator().await;
        fs.create(&path("a.md"), b"hello").await.unwrap();
        orch.push(path("a.md")).await;
        let old_doc_id = metadata.get(&path("a.md")).unwrap().document_id;

        // The host already moved the file on disk before reporting the rename.
        fs.move_path(&path("a.md"), &path("notes/a.md")).await.unwrap();
        orch.rename(path("a.md"), path("notes/a.md")).await;

        assert!(metadata.get(&path("a.md")).is_none());
        let new_meta = metadata.get(&path("notes/a.md")).unwrap();
        assert_ne!(new_meta.document_id, old_doc_id, "rename with no prior metadata at the new path must create a fresh document");
        assert!(changelog.get_content(old_doc_id).await.is_err(), "old document must be deleted on the remote");
    }

    #[tokio::test]
    async fn rename_onto_tracked_path_carries_old_identity_forward() {
        let (orch, fs, _changelog, metadata) = new_orchestrator().await;
        fs.create(&path("a.md"), b"hello").await.unwrap();
        orch.push(path("a.md")).await;
        let old_meta = metadata.get(&path("a.md")).unwrap();

        fs.create(&path("notes/a.md"), b"other content").await.unwrap();
        orch.push(path("notes/a.md")).await;

        // The host already moved (and overwrote) the file on disk.
        fs.move_path(&path("a.md"), &path("notes/a.md")).await.unwrap();
        orch.rename(path("a.md"), path("notes/a.md")).await;

        let final_meta = metadata.get(&path("notes/a.md")).unwrap();
        assert_eq!(final_meta.document_id, old_meta.document_id, "identity at the new path must carry over from the old path");
        assert_eq!(final_meta.parent_version_id, old_meta.parent_version_id);
    }

    #[tokio::test]
    async fn pull_of_new_remote_document_converts_to_native_line_endings() {
        let fs = MemoryFileOps::new();
        let changelog = MemoryChangeLogClient::new();
        let metadata = Arc::new(MetadataStore::load(Arc::new(InMemoryPersistence::new())).await.unwrap());
        metadata.update_settings(SyncSettings { upload_concurrency: 4, ..Default::default() }).await.unwrap();
        let history = Arc::new(History::new(HistoryConfig::default()));
        let orch = Orchestrator::new(Arc::new(fs.clone()), Arc::new(changelog.clone()), metadata.clone(), history, crate::binary::NativeLineEndings::Crlf);

        changelog.seed_remote_change(crate::model::DocumentId::new(), path("a.md"), b"line one\nline two\n".to_vec());
        orch.run_pull_cycle().await;

        assert_eq!(fs.contents(&path("a.md")).unwrap(), b"line one\r\nline two\r\n");
        // Metadata hashes the canonical (LF) content so a later read (which re-normalizes
        // CRLF away) still matches without spuriously looking locally diverged.
        assert_eq!(metadata.get(&path("a.md")).unwrap().hash, ContentHash::of(b"line one\nline two\n"));
    }

    #[tokio::test]
    async fn check_connection_reports_ping_failure() {
        let (orch, _fs, changelog, _metadata) = new_orchestrator().await;
        changelog.set_ping_failure(true);
        let status = orch.check_connection().await;
        assert!(!status.is_successful);
        assert!(!status.is_web_socket_connected);
    }

    #[tokio::test]
    async fn pending_ops_listener_sees_push_enter_and_exit() {
        let (orch, fs, _changelog, _metadata) = new_orchestrator().await;
        fs.create(&path("a.md"), b"hello").await.unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        orch.add_pending_ops_listener(move |count| seen_clone.lock().push(count));

        orch.push(path("a.md")).await;

        let seen = seen.lock();
        assert_eq!(seen.as_slice(), &[1, 0]);
        assert_eq!(orch.pending_ops(), 0);
    }

    #[tokio::test]
    async fn rename_reflected_from_server_moves_local_file() {
        let (orch, fs, changelog, metadata) = new_orchestrator().await;
        changelog.force_next_put_rename(path("notes/a.md"));

        fs.create(&path("a.md"), b"hello").await.unwrap();
        orch.push(path("a.md")).await;

        assert!(metadata.get(&path("a.md")).is_none());
        assert!(metadata.get(&path("notes/a.md")).is_some());
        assert_eq!(fs.contents(&path("notes/a.md")).unwrap(), b"hello");
        assert!(fs.contents(&path("a.md")).is_none());
    }
}
