//! Crate-wide error composition.
//!
//! Each module defines its own scoped error enum; [`CoreError`] composes them at the
//! orchestrator boundary, the one place in this crate a `Result` can surface a fault
//! that the caller must act on. Everything below the orchestrator either resolves
//! locally or propagates via `#[from]` into this enum.

use crate::changelog::ChangeLogError;
use crate::fileops::FileOpsError;
use crate::lock::LockError;
use crate::persistence::PersistenceError;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("file operation failed: {0}")]
    FileOps(#[from] FileOpsError),

    #[error("change-log request failed: {0}")]
    ChangeLog(#[from] ChangeLogError),

    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("path is invalid: {0}")]
    InvalidPath(String),
}
