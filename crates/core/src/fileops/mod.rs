//! Host-neutral file operations (`SPEC_FULL.md` §4.3).
//!
//! Real hosts implement this trait against actual I/O (the `vaultsync-daemon` crate
//! does so over `tokio::fs`); this crate only needs the contract plus an in-memory
//! fake for deterministic tests.

pub mod memory;

use std::time::SystemTime;

use async_trait::async_trait;

use crate::binary;
use crate::path::RelativePath;
use crate::reconcile::merge_text;

pub use memory::MemoryFileOps;

#[derive(Debug, thiserror::Error)]
pub enum FileOpsError {
    #[error("path not found: {0}")]
    NotFound(RelativePath),
    #[error("io error on '{path}': {source}")]
    Io {
        path: RelativePath,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait FileOps: Send + Sync {
    async fn list_all(&self) -> Result<Vec<RelativePath>, FileOpsError>;

    /// Reads file content, normalizing CRLF to LF for mergeable (text) files.
    async fn read(&self, path: &RelativePath) -> Result<Vec<u8>, FileOpsError>;

    async fn exists(&self, path: &RelativePath) -> Result<bool, FileOpsError>;

    async fn get_file_size(&self, path: &RelativePath) -> Result<u64, FileOpsError>;

    async fn get_modification_time(&self, path: &RelativePath) -> Result<SystemTime, FileOpsError>;

    /// Creates parent directories as needed. If `path` already exists, delegates to
    /// [`FileOps::write`] with an empty `expected` rather than erroring.
    async fn create(&self, path: &RelativePath, bytes: &[u8]) -> Result<(), FileOpsError> {
        if self.exists(path).await? {
            self.write(path, b"", bytes).await?;
            Ok(())
        } else {
            self.create_new(path, bytes).await
        }
    }

    /// Host-specific creation of a brand-new file plus its parent directories.
    async fn create_new(&self, path: &RelativePath, bytes: &[u8]) -> Result<(), FileOpsError>;

    /// Writes `new_bytes`, merging against whatever is currently on disk if it no
    /// longer matches `expected_bytes`. Returns the bytes actually written.
    ///
    /// - If the path has vanished, returns empty bytes without recreating it.
    /// - If the current content is binary, overwrites outright (last-writer-wins).
    /// - If current content equals `expected_bytes`, writes `new_bytes` verbatim.
    /// - Otherwise three-way merges `expected_bytes`/current/`new_bytes` as text.
    async fn write(&self, path: &RelativePath, expected_bytes: &[u8], new_bytes: &[u8]) -> Result<Vec<u8>, FileOpsError> {
        if !self.exists(path).await? {
            return Ok(Vec::new());
        }
        let current = self.read(path).await?;

        let final_bytes = if !binary::is_text(&current) {
            new_bytes.to_vec()
        } else if current == expected_bytes {
            new_bytes.to_vec()
        } else {
            let expected_str = String::from_utf8_lossy(expected_bytes);
            let current_str = String::from_utf8_lossy(&current);
            let new_str = String::from_utf8_lossy(new_bytes);
            merge_text(&expected_str, &current_str, &new_str).into_bytes()
        };

        self.write_raw(path, &final_bytes).await?;
        Ok(final_bytes)
    }

    /// Host-specific unconditional overwrite of existing content.
    async fn write_raw(&self, path: &RelativePath, bytes: &[u8]) -> Result<(), FileOpsError>;

    /// Idempotent on a missing path.
    async fn remove(&self, path: &RelativePath) -> Result<(), FileOpsError>;

    /// Idempotent when `old == new`. Creates parent directories of `new`.
    async fn move_path(&self, old: &RelativePath, new: &RelativePath) -> Result<(), FileOpsError>;

    /// Whether this path should participate in sync at all (host policy hook).
    async fn is_eligible_for_sync(&self, path: &RelativePath) -> Result<bool, FileOpsError> {
        let _ = path;
        Ok(true)
    }
}
