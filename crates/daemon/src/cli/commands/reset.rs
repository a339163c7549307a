use std::fmt;

use clap::Args;

use crate::cli::op::{Op, OpContext};

/// Clears tracked document metadata and the pull cursor, forcing a full re-sync
/// of every local path on the next push and every remote document on the next pull.
#[derive(Args, Debug, Clone)]
pub struct Reset {
    /// Skip the interactive confirmation prompt.
    #[arg(long)]
    pub yes: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("reset aborted")]
    Aborted,
    #[error("failed to persist reset state: {0}")]
    Persistence(#[from] vaultsync_core::persistence::PersistenceError),
}

pub struct ResetOutput;

impl fmt::Display for ResetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sync state reset")
    }
}

#[async_trait::async_trait]
impl Op for Reset {
    type Error = ResetError;
    type Output = ResetOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        if !self.yes {
            return Err(ResetError::Aborted);
        }
        ctx.client.reset_sync_state().await?;
        Ok(ResetOutput)
    }
}
