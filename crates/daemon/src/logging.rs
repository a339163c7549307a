//! `tracing-subscriber` initialization for the CLI/daemon binary.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `directive` (a `tracing_subscriber::EnvFilter`
/// string such as `"info"` or `"vaultsync_core=debug,vaultsync_daemon=info"`), falling
/// back to it when `RUST_LOG` is unset.
pub fn init(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive.to_string()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}
