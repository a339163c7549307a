//! Layered configuration: built-in defaults, `config.toml`, CLI flags, env vars
//! (highest precedence wins), resolved against a per-user config/state directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vaultsync_core::model::SyncSettings;

pub const APP_QUALIFIER: &str = "dev";
pub const APP_ORGANIZATION: &str = "vaultsync";
pub const APP_NAME: &str = "vaultsync";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config file {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("no project directories could be determined for this platform")]
    NoProjectDirs,
}

/// On-disk representation of `config.toml`. Every field is optional so a partial
/// file only overrides what it names; unset fields fall back to [`SyncSettings::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub remote_uri: Option<String>,
    pub token: Option<String>,
    pub vault_name: Option<String>,
    pub vault_root: Option<PathBuf>,
    pub fetch_interval_ms: Option<u64>,
    pub upload_concurrency: Option<usize>,
    pub is_sync_enabled: Option<bool>,
    pub log_filter: Option<String>,
}

/// CLI overrides, one field per global flag. `None` means "not passed".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub remote_uri: Option<String>,
    pub token: Option<String>,
    pub vault_name: Option<String>,
    pub vault_root: Option<PathBuf>,
    pub fetch_interval_ms: Option<u64>,
    pub upload_concurrency: Option<usize>,
    pub log_filter: Option<String>,
}

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: SyncSettings,
    pub vault_root: PathBuf,
    pub state_path: PathBuf,
    pub log_filter: String,
    /// The `config.toml` path this was resolved from, watched by `start` for hot
    /// reload of [`SyncSettings`] (`vault_root`/`log_filter` still require a restart).
    pub config_path: PathBuf,
}

impl AppConfig {
    /// Resolves the layered config: defaults, then `config.toml` (if present),
    /// then CLI flags, then environment variables, each overriding the last.
    pub fn load(config_path: Option<&Path>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let dirs = directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).ok_or(ConfigError::NoProjectDirs)?;

        let resolved_config_path = config_path.map(PathBuf::from).unwrap_or_else(|| dirs.config_dir().join("config.toml"));
        let file = load_file_config(&resolved_config_path)?;

        let mut settings = SyncSettings::default();
        if let Some(v) = file.remote_uri { settings.remote_uri = v; }
        if let Some(v) = file.token { settings.token = v; }
        if let Some(v) = file.vault_name { settings.vault_name = v; }
        if let Some(v) = file.fetch_interval_ms { settings.fetch_interval_ms = v; }
        if let Some(v) = file.upload_concurrency { settings.upload_concurrency = v; }
        if let Some(v) = file.is_sync_enabled { settings.is_sync_enabled = v; }
        let mut vault_root = file.vault_root.unwrap_or_else(|| dirs.data_dir().join("vault"));
        let mut log_filter = file.log_filter.unwrap_or_else(|| "info".to_string());

        if let Some(v) = overrides.remote_uri { settings.remote_uri = v; }
        if let Some(v) = overrides.token { settings.token = v; }
        if let Some(v) = overrides.vault_name { settings.vault_name = v; }
        if let Some(v) = overrides.fetch_interval_ms { settings.fetch_interval_ms = v; }
        if let Some(v) = overrides.upload_concurrency { settings.upload_concurrency = v; }
        if let Some(v) = overrides.vault_root { vault_root = v; }
        if let Some(v) = overrides.log_filter { log_filter = v; }

        if let Ok(v) = std::env::var("VAULTSYNC_REMOTE_URI") { settings.remote_uri = v; }
        if let Ok(v) = std::env::var("VAULTSYNC_TOKEN") { settings.token = v; }
        if let Ok(v) = std::env::var("VAULTSYNC_LOG") { log_filter = v; }

        let state_path = dirs.data_dir().join("state.json");

        Ok(Self { settings, vault_root, state_path, log_filter, config_path: resolved_config_path })
    }

    /// Re-reads `config.toml` at `self.config_path` and returns the [`SyncSettings`]
    /// it produces, still layered under the same CLI overrides and env vars as the
    /// original `load`. Used by `start`'s config-file watch for hot reload; `vault_root`
    /// and `log_filter` are intentionally not re-applied here since the watcher,
    /// persistence path, and log subscriber are already set up around their original
    /// values for this process's lifetime.
    pub fn reload_settings(&self, config_path: &Path, overrides: CliOverrides) -> Result<SyncSettings, ConfigError> {
        Ok(Self::load(Some(config_path), overrides)?.settings)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).map(|d| d.config_dir().join("config.toml"))
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read { path: path.to_path_buf(), source: e })?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })
}
