use std::fmt;

use clap::Args;
use vaultsync_core::history::LogLevel;

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct History {
    /// Only show entries at or above this level (debug, info, warning, error).
    #[arg(long, default_value = "info")]
    pub level: String,

    /// Maximum number of entries to print, most recent last.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

pub struct HistoryOutput(pub Vec<vaultsync_core::model::HistoryEntry>);

impl fmt::Display for HistoryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(no history entries)");
        }
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{} [{:?}/{:?}] {} - {}",
                entry.timestamp.to_rfc3339(),
                entry.source,
                entry.op_type,
                entry.relative_path,
                entry.message
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("unknown log level '{0}' (expected debug, info, warning, or error)")]
    UnknownLevel(String),
}

#[async_trait::async_trait]
impl Op for History {
    type Error = HistoryError;
    type Output = HistoryOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let min_level = parse_level(&self.level)?;
        let mut entries = ctx.client.history_snapshot_at_least(min_level);
        if entries.len() > self.limit {
            entries = entries.split_off(entries.len() - self.limit);
        }
        Ok(HistoryOutput(entries))
    }
}

fn parse_level(s: &str) -> Result<LogLevel, HistoryError> {
    match s.to_ascii_lowercase().as_str() {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warning" | "warn" => Ok(LogLevel::Warning),
        "error" => Ok(LogLevel::Error),
        other => Err(HistoryError::UnknownLevel(other.to_string())),
    }
}
