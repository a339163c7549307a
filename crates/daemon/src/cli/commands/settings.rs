use std::fmt;

use clap::Subcommand;

use crate::cli::op::{Op, OpContext};

#[derive(Subcommand, Debug, Clone)]
pub enum Settings {
    /// Print the current sync settings.
    Get,
    /// Update a single sync setting by key.
    Set {
        /// One of: remote-uri, token, vault-name, fetch-interval-ms, upload-concurrency, is-sync-enabled.
        key: String,
        value: String,
    },
}

pub struct SettingsOutput(pub vaultsync_core::model::SyncSettings);

impl fmt::Display for SettingsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "remote_uri:         {}", self.0.remote_uri)?;
        writeln!(f, "vault_name:         {}", self.0.vault_name)?;
        writeln!(f, "fetch_interval_ms:  {}", self.0.fetch_interval_ms)?;
        writeln!(f, "upload_concurrency: {}", self.0.upload_concurrency)?;
        write!(f, "is_sync_enabled:    {}", self.0.is_sync_enabled)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("unknown settings key '{0}'")]
    UnknownKey(String),
    #[error("invalid value '{value}' for key '{key}': {reason}")]
    InvalidValue { key: String, value: String, reason: String },
    #[error("failed to persist settings: {0}")]
    Persistence(#[from] vaultsync_core::persistence::PersistenceError),
}

#[async_trait::async_trait]
impl Op for Settings {
    type Error = SettingsError;
    type Output = SettingsOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        match self {
            Settings::Get => Ok(SettingsOutput(ctx.client.get_settings())),
            Settings::Set { key, value } => {
                let mut settings = ctx.client.get_settings();
                apply_key(&mut settings, key, value)?;
                ctx.client.update_settings(settings.clone()).await?;
                Ok(SettingsOutput(settings))
            }
        }
    }
}

fn apply_key(settings: &mut vaultsync_core::model::SyncSettings, key: &str, value: &str) -> Result<(), SettingsError> {
    match key {
        "remote-uri" => settings.remote_uri = value.to_string(),
        "token" => settings.token = value.to_string(),
        "vault-name" => settings.vault_name = value.to_string(),
        "fetch-interval-ms" => {
            settings.fetch_interval_ms =
                value.parse().map_err(|e: std::num::ParseIntError| SettingsError::InvalidValue { key: key.to_string(), value: value.to_string(), reason: e.to_string() })?;
        }
        "upload-concurrency" => {
            settings.upload_concurrency =
                value.parse().map_err(|e: std::num::ParseIntError| SettingsError::InvalidValue { key: key.to_string(), value: value.to_string(), reason: e.to_string() })?;
        }
        "is-sync-enabled" => {
            settings.is_sync_enabled =
                value.parse().map_err(|e: std::str::ParseBoolError| SettingsError::InvalidValue { key: key.to_string(), value: value.to_string(), reason: e.to_string() })?;
        }
        other => return Err(SettingsError::UnknownKey(other.to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_key_rejects_unknown_key() {
        let mut settings = vaultsync_core::model::SyncSettings::default();
        assert!(matches!(apply_key(&mut settings, "nonsense", "x"), Err(SettingsError::UnknownKey(_))));
    }

    #[test]
    fn apply_key_parses_numeric_and_bool_values() {
        let mut settings = vaultsync_core::model::SyncSettings::default();
        apply_key(&mut settings, "fetch-interval-ms", "1000").unwrap();
        apply_key(&mut settings, "is-sync-enabled", "false").unwrap();
        assert_eq!(settings.fetch_interval_ms, 1000);
        assert!(!settings.is_sync_enabled);
    }
}
