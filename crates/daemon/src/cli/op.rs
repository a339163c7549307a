//! The per-subcommand `Op` contract: each CLI subcommand is a struct implementing
//! this trait against a shared [`OpContext`], mirroring how subcommands plug into
//! a single dispatch point without a hand-rolled match arm per operation.

use std::sync::Arc;

use vaultsync_core::client::SyncClient;

use crate::changelog_http::HttpChangeLogClient;
use crate::config::AppConfig;
use crate::fileops_local::LocalFileOps;

pub type DaemonClient = SyncClient<LocalFileOps, HttpChangeLogClient>;

pub struct OpContext {
    pub client: Arc<DaemonClient>,
    pub config: AppConfig,
}

#[async_trait::async_trait]
pub trait Op {
    type Error: std::fmt::Display;
    type Output: std::fmt::Display;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}
