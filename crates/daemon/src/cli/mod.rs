//! Command-line surface: global flags layer over [`crate::config::AppConfig`],
//! each subcommand is an [`op::Op`] dispatched against a shared [`op::OpContext`].

pub mod commands;
pub mod op;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use url::Url;
use vaultsync_core::binary::NativeLineEndings;
use vaultsync_core::client::{SyncClient, SyncClientConfig};
use vaultsync_core::persistence::StatePersistence;

use crate::changelog_http::HttpChangeLogClient;
use crate::config::{AppConfig, CliOverrides};
use crate::fileops_local::LocalFileOps;
use crate::persistence_file::FilePersistence;
use op::{Op, OpContext};

#[derive(Parser, Debug)]
#[command(name = "vaultsync", version, about = "Two-way vault sync daemon and CLI")]
pub struct Cli {
    /// Path to config.toml. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the remote API base URL.
    #[arg(long, global = true)]
    pub remote_uri: Option<String>,

    /// Overrides the remote API bearer token.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Overrides the local vault root directory.
    #[arg(long, global = true)]
    pub vault_root: Option<PathBuf>,

    /// Overrides the vault name reported to the remote.
    #[arg(long, global = true)]
    pub vault_name: Option<String>,

    /// Overrides the pull polling interval, in milliseconds.
    #[arg(long, global = true)]
    pub fetch_interval_ms: Option<u64>,

    /// Overrides the concurrent upload limit.
    #[arg(long, global = true)]
    pub upload_concurrency: Option<usize>,

    /// Overrides the tracing-subscriber filter directive (e.g. "debug", "vaultsync_core=trace").
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the sync loop: watch the vault, push local changes, pull on a timer.
    Start(commands::start::Start),
    /// Print current settings and sync state.
    Status(commands::status::Status),
    /// Print recent sync history.
    History(commands::history::History),
    /// Clear tracked metadata and the pull cursor, forcing a full re-sync.
    Reset(commands::reset::Reset),
    /// Get or set sync settings.
    #[command(subcommand)]
    Settings(commands::settings::Settings),
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            remote_uri: self.remote_uri.clone(),
            token: self.token.clone(),
            vault_name: self.vault_name.clone(),
            vault_root: self.vault_root.clone(),
            fetch_interval_ms: self.fetch_interval_ms,
            upload_concurrency: self.upload_concurrency,
            log_filter: self.log.clone(),
        }
    }
}

/// Resolves configuration, builds a [`OpContext`], dispatches to the matched
/// subcommand, and prints its result. Returns an error for the process to report
/// and exit non-zero on.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref(), cli.overrides())?;
    let ctx = build_context(config).await?;

    match &cli.command {
        Command::Start(op) => dispatch(op, &ctx).await,
        Command::Status(op) => dispatch(op, &ctx).await,
        Command::History(op) => dispatch(op, &ctx).await,
        Command::Reset(op) => dispatch(op, &ctx).await,
        Command::Settings(op) => dispatch(op, &ctx).await,
    }
}

async fn dispatch<O: Op>(op: &O, ctx: &OpContext) -> anyhow::Result<()> {
    match op.execute(ctx).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(err) => Err(anyhow::anyhow!("{err}")),
    }
}

async fn build_context(config: AppConfig) -> anyhow::Result<OpContext> {
    let base_url = Url::parse(&config.settings.remote_uri).unwrap_or_else(|_| Url::parse("http://localhost/").expect("static fallback URL is valid"));

    let fs = LocalFileOps::new(config.vault_root.clone());
    let changelog = HttpChangeLogClient::new(base_url, &config.settings.token)?;
    let persistence: Arc<dyn StatePersistence> = Arc::new(FilePersistence::new(config.state_path.clone()));

    let native_line_endings = if cfg!(target_os = "windows") { NativeLineEndings::Crlf } else { NativeLineEndings::Lf };
    let config_for_client = SyncClientConfig { native_line_endings, ..SyncClientConfig::default() };
    let client = SyncClient::create(fs, changelog, persistence, config_for_client).await?;

    Ok(OpContext { client: Arc::new(client), config })
}
