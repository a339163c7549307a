//! Core reconciliation engine and sync orchestrator.
//!
//! This crate is host-neutral: it knows nothing about real filesystems or HTTP.
//! Hosts (like the `vaultsync-daemon` binary) implement [`fileops::FileOps`] and
//! [`changelog::ChangeLogClient`] against real I/O and hand them to [`client::SyncClient`].

pub mod binary;
pub mod changelog;
pub mod client;
pub mod error;
pub mod fileops;
pub mod hash;
pub mod history;
pub mod lock;
pub mod metadata_store;
pub mod model;
pub mod orchestrator;
pub mod path;
pub mod persistence;
pub mod reconcile;
pub mod tokenize;

pub use client::SyncClient;
pub use error::{CoreError, Result};
pub use model::{
    ContentHash, DocumentId, DocumentMetadata, HistoryEntry, PersistedState, SyncSettings,
    VaultUpdateId,
};
pub use path::RelativePath;
