use std::fmt;

use clap::Args;

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Status;

#[derive(Debug)]
pub struct StatusOutput {
    pub remote_uri: String,
    pub vault_name: String,
    pub vault_root: String,
    pub is_sync_enabled: bool,
    pub fetch_interval_ms: u64,
    pub history_entries: usize,
    pub remaining_sync_operations: usize,
    pub connection_is_successful: bool,
    pub connection_message: String,
}

impl fmt::Display for StatusOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vault:             {}", self.vault_name)?;
        writeln!(f, "vault root:        {}", self.vault_root)?;
        writeln!(f, "remote:            {}", self.remote_uri)?;
        writeln!(f, "connection:        {}", self.connection_message)?;
        writeln!(f, "sync enabled:      {}", self.is_sync_enabled)?;
        writeln!(f, "fetch interval:    {}ms", self.fetch_interval_ms)?;
        writeln!(f, "pending operations:{}", self.remaining_sync_operations)?;
        write!(f, "history entries:   {}", self.history_entries)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {}

#[async_trait::async_trait]
impl Op for Status {
    type Error = StatusError;
    type Output = StatusOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let settings = ctx.client.get_settings();
        let connection = ctx.client.check_connection().await;
        Ok(StatusOutput {
            remote_uri: settings.remote_uri,
            vault_name: settings.vault_name,
            vault_root: ctx.config.vault_root.display().to_string(),
            is_sync_enabled: settings.is_sync_enabled,
            fetch_interval_ms: settings.fetch_interval_ms,
            history_entries: ctx.client.history_snapshot().len(),
            remaining_sync_operations: ctx.client.remaining_sync_operations(),
            connection_is_successful: connection.is_successful,
            connection_message: connection.server_message,
        })
    }
}
