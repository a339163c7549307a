//! Client facade (`SPEC_FULL.md` §6): the public surface used by hosts and UIs.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::binary::NativeLineEndings;
use crate::changelog::ChangeLogClient;
use crate::fileops::FileOps;
use crate::history::{History, HistoryConfig, SharedHistory};
use crate::metadata_store::MetadataStore;
use crate::model::{ConnectionStatus, HistoryEntry, SyncSettings, WebSocketStatus};
use crate::orchestrator::Orchestrator;
use crate::path::RelativePath;
use crate::persistence::{PersistenceError, StatePersistence};

pub struct SyncClientConfig {
    pub history_capacity: usize,
    /// The host's native line ending; text content pulled from the remote is
    /// converted to it on its final write to disk.
    pub native_line_endings: NativeLineEndings,
}

impl Default for SyncClientConfig {
    fn default() -> Self {
        Self { history_capacity: crate::history::DEFAULT_CAPACITY, native_line_endings: NativeLineEndings::default() }
    }
}

type WebSocketStatusListener = Box<dyn Fn(WebSocketStatus) + Send + Sync>;

/// The engine's public entry point. Owns the lock table (via the orchestrator), the
/// metadata map, and the history buffer; hosts drive filesystem events in through
/// `on_create`/`on_modify`/`on_delete`/`on_rename` and observe results via listeners.
pub struct SyncClient<F, C> {
    orchestrator: Arc<Orchestrator<F, C>>,
    metadata: Arc<MetadataStore>,
    history: SharedHistory,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    pull_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    ws_listeners: RwLock<Vec<WebSocketStatusListener>>,
    last_ws_status: RwLock<Option<WebSocketStatus>>,
}

impl<F, C> SyncClient<F, C>
where
    F: FileOps + 'static,
    C: ChangeLogClient + 'static,
{
    pub async fn create(
        fs: F,
        changelog: C,
        persistence: Arc<dyn StatePersistence>,
        config: SyncClientConfig,
    ) -> Result<Self, PersistenceError> {
        let metadata = Arc::new(MetadataStore::load(persistence).await?);
        let history = Arc::new(History::new(HistoryConfig::from_capacity(config.history_capacity)));
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(fs),
            Arc::new(changelog),
            metadata.clone(),
            history.clone(),
            config.native_line_endings,
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            orchestrator,
            metadata,
            history,
            shutdown_tx,
            shutdown_rx,
            pull_task: parking_lot::Mutex::new(None),
            ws_listeners: RwLock::new(Vec::new()),
            last_ws_status: RwLock::new(None),
        })
    }

    /// Idempotent: starting an already-started client is a no-op.
    pub fn start(&self) {
        let mut pull_task = self.pull_task.lock();
        if pull_task.is_some() {
            return;
        }

        let orchestrator = self.orchestrator.clone();
        let metadata = self.metadata.clone();
        let mut shutdown_rx = self.shutdown_rx.clone();
        let _ = self.shutdown_tx.send(false);

        *pull_task = Some(tokio::spawn(async move {
            loop {
                let interval_ms = metadata.settings().fetch_interval_ms.max(1);
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_millis(interval_ms)) => {
                        if !metadata.settings().is_sync_enabled {
                            continue;
                        }
                        orchestrator.run_pull_cycle().await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("sync client stopping pull loop");
                            break;
                        }
                    }
                }
            }
        }));
    }

    /// Stops the pull loop. In-flight network calls are left to finish; their
    /// results are discarded rather than applied, to avoid inconsistent metadata.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.pull_task.lock().take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(30), handle).await;
        }
    }

    pub fn get_settings(&self) -> SyncSettings {
        self.metadata.settings()
    }

    pub async fn update_settings(&self, settings: SyncSettings) -> Result<(), PersistenceError> {
        self.metadata.update_settings(settings).await
    }

    pub async fn reset_sync_state(&self) -> Result<(), PersistenceError> {
        self.metadata.reset().await
    }

    pub fn on_create(&self, path: RelativePath) {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move { orchestrator.push(path).await });
    }

    pub fn on_modify(&self, path: RelativePath) {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move { orchestrator.push(path).await });
    }

    pub fn on_delete(&self, path: RelativePath) {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move { orchestrator.delete(path).await });
    }

    pub fn on_rename(&self, old: RelativePath, new: RelativePath) {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move { orchestrator.rename(old, new).await });
    }

    pub fn add_sync_history_update_listener(&self, listener: impl Fn(&HistoryEntry) + Send + Sync + 'static) {
        self.history.add_listener(listener);
    }

    pub fn add_on_settings_change_listener(&self, listener: impl Fn(&SyncSettings) + Send + Sync + 'static) {
        self.metadata.add_settings_change_listener(listener);
    }

    /// Registers a listener for the count of sync operations still in flight or
    /// waiting on their per-path lock. Fires once per change, immediately on both
    /// entering and completing a push/delete.
    pub fn add_remaining_sync_operations_listener(&self, listener: impl Fn(usize) + Send + Sync + 'static) {
        self.orchestrator.add_pending_ops_listener(listener);
    }

    pub fn remaining_sync_operations(&self) -> usize {
        self.orchestrator.pending_ops()
    }

    /// One-shot reachability probe against the remote. There is no persistent
    /// WebSocket channel in this engine, so `is_web_socket_connected` always mirrors
    /// `is_successful`; call this periodically (or from `start`'s pull loop) rather
    /// than expecting a pushed notification.
    pub async fn check_connection(&self) -> ConnectionStatus {
        let status = self.orchestrator.check_connection().await;
        let ws_status = if status.is_web_socket_connected { WebSocketStatus::Connected } else { WebSocketStatus::Disconnected };
        let changed = *self.last_ws_status.read() != Some(ws_status);
        if changed {
            *self.last_ws_status.write() = Some(ws_status);
            for listener in self.ws_listeners.read().iter() {
                listener(ws_status);
            }
        }
        status
    }

    /// Registers a listener invoked whenever `check_connection` observes the derived
    /// WebSocket status change.
    pub fn add_web_socket_status_change_listener(&self, listener: impl Fn(WebSocketStatus) + Send + Sync + 'static) {
        self.ws_listeners.write().push(Box::new(listener));
    }

    pub fn history_snapshot(&self) -> Vec<HistoryEntry> {
        self.history.snapshot()
    }

    pub fn history_snapshot_at_least(&self, min_level: crate::history::LogLevel) -> Vec<HistoryEntry> {
        self.history.snapshot_at_least(min_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::MemoryChangeLogClient;
    use crate::fileops::MemoryFileOps;
    use crate::persistence::InMemoryPersistence;

    #[tokio::test]
    async fn start_is_idempotent() {
        let client = SyncClient::create(
            MemoryFileOps::new(),
            MemoryChangeLogClient::new(),
            Arc::new(InMemoryPersistence::new()),
            SyncClientConfig::default(),
        )
        .await
        .unwrap();

        client.start();
        client.start();
        client.stop().await;
    }

    #[tokio::test]
    async fn on_create_enqueues_a_push_and_records_history() {
        let fs = MemoryFileOps::new();
        fs.seed(RelativePath::new("a.md").unwrap(), b"hello".to_vec());
        let client = SyncClient::create(fs, MemoryChangeLogClient::new(), Arc::new(InMemoryPersistence::new()), SyncClientConfig::default())
            .await
            .unwrap();

        client.on_create(RelativePath::new("a.md").unwrap());
        // Allow the spawned push task to run.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert!(!client.history_snapshot().is_empty());
    }

    #[tokio::test]
    async fn check_connection_reports_success_and_fires_ws_listener_once() {
        let client = SyncClient::create(
            MemoryFileOps::new(),
            MemoryChangeLogClient::new(),
            Arc::new(InMemoryPersistence::new()),
            SyncClientConfig::default(),
        )
        .await
        .unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        client.add_web_socket_status_change_listener(move |status| seen_clone.lock().push(status));

        let status = client.check_connection().await;
        assert!(status.is_successful);
        assert!(status.is_web_socket_connected);
        client.check_connection().await;

        // The listener fires once, on the transition into `Connected`, not again on
        // the second call since the status did not change.
        assert_eq!(seen.lock().as_slice(), &[WebSocketStatus::Connected]);
    }

    #[tokio::test]
    async fn remaining_sync_operations_listener_observes_a_push() {
        let fs = MemoryFileOps::new();
        fs.seed(RelativePath::new("a.md").unwrap(), b"hello".to_vec());
        let client = SyncClient::create(fs, MemoryChangeLogClient::new(), Arc::new(InMemoryPersistence::new()), SyncClientConfig::default())
            .await
            .unwrap();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        client.add_remaining_sync_operations_listener(move |count| seen_clone.lock().push(count));

        client.on_create(RelativePath::new("a.md").unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(seen.lock().as_slice(), &[1, 0]);
        assert_eq!(client.remaining_sync_operations(), 0);
    }
}
