//! Data model: identifiers, document metadata, settings, persisted state, history.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::path::RelativePath;

/// Stable identifier assigned by the remote on first push. Survives renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub uuid::Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing id assigned by the remote to each accepted change.
/// Doubles as the cursor for incremental pulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultUpdateId(pub u64);

impl std::fmt::Display for VaultUpdateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-path bookkeeping: which remote document this path corresponds to, the
/// version it was last synced against, and the hash of that synced content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_id: DocumentId,
    pub parent_version_id: VaultUpdateId,
    pub hash: ContentHash,
}

/// Client-configurable sync behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub remote_uri: String,
    pub token: String,
    pub vault_name: String,
    pub fetch_interval_ms: u64,
    pub upload_concurrency: usize,
    pub is_sync_enabled: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            remote_uri: String::new(),
            token: String::new(),
            vault_name: String::new(),
            fetch_interval_ms: 30_000,
            upload_concurrency: 4,
            is_sync_enabled: true,
        }
    }
}

/// The engine's entire durable state, persisted as a single opaque blob via an
/// injected load/save pair. Unknown keys from a newer schema round-trip untouched
/// through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub documents: HashMap<RelativePath, DocumentMetadata>,
    pub settings: SyncSettings,
    pub last_seen_update_id: Option<VaultUpdateId>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistorySource {
    Push,
    Pull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryOpType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryStatus {
    Success,
    Error,
    NoOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub relative_path: RelativePath,
    pub source: HistorySource,
    pub op_type: HistoryOpType,
    pub status: HistoryStatus,
    pub level: crate::history::LogLevel,
    pub message: String,
}

/// Result of a one-shot reachability probe against the remote (`SyncClient::check_connection`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_successful: bool,
    pub is_web_socket_connected: bool,
    pub server_message: String,
}

/// Whether the (currently polling-only) change-log transport believes itself live.
/// There is no real WebSocket channel; this mirrors [`ConnectionStatus::is_successful`]
/// so hosts that already wired a websocket-style status listener keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebSocketStatus {
    Connected,
    Disconnected,
}
