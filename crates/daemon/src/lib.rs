//! Host bindings for `vaultsync-core`: real filesystem I/O, an HTTP change-log
//! client, a `notify`-based watcher, layered configuration, and the CLI.

pub mod changelog_http;
pub mod cli;
pub mod config;
pub mod config_watch;
pub mod fileops_local;
pub mod logging;
pub mod persistence_file;
pub mod watcher;
