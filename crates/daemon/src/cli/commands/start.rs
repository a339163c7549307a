use std::fmt;

use clap::Args;

use crate::cli::op::{DaemonClient, Op, OpContext};
use crate::config::CliOverrides;
use crate::config_watch::ConfigWatcher;
use crate::watcher::{VaultWatcher, WatchEvent};

/// Runs the sync loop until interrupted: watches the vault for local changes,
/// pushes them, and periodically pulls remote changes on the configured interval.
#[derive(Args, Debug, Clone)]
pub struct Start;

pub struct StartOutput;

impl fmt::Display for StartOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "daemon stopped")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("failed to start filesystem watcher: {0}")]
    Watch(#[from] crate::watcher::WatchError),
    #[error("failed to wait for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl Op for Start {
    type Error = StartError;
    type Output = StartOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        ctx.client.start();
        tracing::info!(vault_root = %ctx.config.vault_root.display(), "daemon started");

        let mut watcher = VaultWatcher::new(&ctx.config.vault_root)?;
        let pump = {
            let client = ctx.client.clone();
            tokio::spawn(async move { pump_watch_events(&client, &mut watcher).await })
        };

        let mut config_watcher = ConfigWatcher::new(&ctx.config.config_path);
        let config_pump = {
            let client = ctx.client.clone();
            let config = ctx.config.clone();
            tokio::spawn(async move { pump_config_reloads(&client, &config, &mut config_watcher).await })
        };

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown signal received");
        pump.abort();
        config_pump.abort();
        ctx.client.stop().await;

        Ok(StartOutput)
    }
}

async fn pump_watch_events(client: &DaemonClient, watcher: &mut VaultWatcher) {
    while let Some(event) = watcher.recv().await {
        match event {
            WatchEvent::Created(path) => client.on_create(path),
            WatchEvent::Modified(path) => client.on_modify(path),
            WatchEvent::Removed(path) => client.on_delete(path),
            WatchEvent::Renamed { from, to } => client.on_rename(from, to),
        }
    }
}

/// Re-resolves [`crate::config::AppConfig::reload_settings`] on each debounced
/// change to the config file and pushes the result through `update_settings`.
/// `vault_root` and `log_filter` are fixed for the process's lifetime; only the
/// fields `SyncSettings` carries can change without a restart.
async fn pump_config_reloads(client: &DaemonClient, config: &crate::config::AppConfig, watcher: &mut ConfigWatcher) {
    while watcher.recv().await.is_some() {
        match config.reload_settings(&config.config_path, CliOverrides::default()) {
            Ok(settings) => {
                if let Err(e) = client.update_settings(settings).await {
                    tracing::error!("failed to persist reloaded settings: {e}");
                }
                tracing::info!("config file changed, settings reloaded");
            }
            Err(e) => tracing::error!("config file changed but failed to parse: {e}"),
        }
    }
}
