//! Change-log client contract (`SPEC_FULL.md` §4.4).
//!
//! This crate only defines the trait, the error taxonomy, and the shared retry
//! policy; the concrete HTTP transport lives in the daemon crate since it is host
//! binding, not sync logic. [`memory`] provides an in-process fake for tests.

pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::MemoryChangeLogClient;

use crate::model::{DocumentId, VaultUpdateId};
use crate::path::RelativePath;

pub const MAX_RETRY_ATTEMPTS: u32 = 6;
pub const RETRY_BASE_DELAY_MS: u64 = 500;
pub const RETRY_BACKOFF_FACTOR: f64 = 1.5;

#[derive(Debug, thiserror::Error)]
pub enum ChangeLogError {
    /// Network-level failure or 5xx response; retried by [`retry_with_backoff`].
    #[error("transport error: {0}")]
    Transport(String),
    #[error("too many requests")]
    RateLimited,
    #[error("authentication failed")]
    Auth,
    #[error("server rejected push: parent version is stale")]
    StaleParent,
    #[error("document not found")]
    NotFound,
    /// Any other 4xx (not 429): permanent, not retried.
    #[error("remote rejected request: {0}")]
    Permanent(String),
}

impl ChangeLogError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChangeLogError::Transport(_) | ChangeLogError::RateLimited)
    }
}

#[derive(Debug, Clone)]
pub struct PingResult {
    pub server_version: String,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone)]
pub struct RemoteDocVersion {
    pub document_id: DocumentId,
    pub relative_path: RelativePath,
    pub vault_update_id: VaultUpdateId,
    pub is_deleted: bool,
    pub content_bytes: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ChangesSince {
    pub latest_documents: Vec<RemoteDocVersion>,
    pub last_update_id: VaultUpdateId,
}

#[derive(Debug, Clone)]
pub struct PutResult {
    pub document_id: DocumentId,
    pub version_id: VaultUpdateId,
    pub relative_path: RelativePath,
    pub content_bytes: Vec<u8>,
}

#[async_trait]
pub trait ChangeLogClient: Send + Sync {
    async fn ping(&self) -> Result<PingResult, ChangeLogError>;

    async fn get_changes_since(&self, cursor: Option<VaultUpdateId>) -> Result<ChangesSince, ChangeLogError>;

    async fn get_content(&self, document_id: DocumentId) -> Result<Vec<u8>, ChangeLogError>;

    async fn put(
        &self,
        parent_version_id: Option<VaultUpdateId>,
        relative_path: RelativePath,
        content_bytes: Vec<u8>,
        created_date: DateTime<Utc>,
    ) -> Result<PutResult, ChangeLogError>;

    async fn delete(&self, document_id: DocumentId, created_date: DateTime<Utc>) -> Result<(), ChangeLogError>;
}

/// Runs `attempt` up to [`MAX_RETRY_ATTEMPTS`] times, sleeping `RETRY_BASE_DELAY_MS *
/// RETRY_BACKOFF_FACTOR^n` between tries while the error is retryable. Non-retryable
/// errors (and the final attempt) return immediately.
pub async fn retry_with_backoff<T, F, Fut>(mut attempt: F) -> Result<T, ChangeLogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ChangeLogError>>,
{
    let mut delay_ms = RETRY_BASE_DELAY_MS as f64;
    for attempt_num in 0..MAX_RETRY_ATTEMPTS {
        match attempt().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt_num + 1 < MAX_RETRY_ATTEMPTS => {
                tracing::warn!(attempt = attempt_num + 1, delay_ms, "retrying change-log request: {e}");
                tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
                delay_ms *= RETRY_BACKOFF_FACTOR;
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("loop always returns within MAX_RETRY_ATTEMPTS iterations")
}
