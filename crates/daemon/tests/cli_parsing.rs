use clap::Parser;
use vaultsync_daemon::cli::{Cli, Command};

#[test]
fn parses_status_with_no_flags() {
    let cli = Cli::try_parse_from(["vaultsync", "status"]).unwrap();
    assert!(matches!(cli.command, Command::Status(_)));
}

#[test]
fn parses_global_overrides_before_subcommand() {
    let cli = Cli::try_parse_from([
        "vaultsync",
        "--remote-uri",
        "https://vault.example.com",
        "--fetch-interval-ms",
        "5000",
        "start",
    ])
    .unwrap();

    assert_eq!(cli.remote_uri.as_deref(), Some("https://vault.example.com"));
    assert_eq!(cli.fetch_interval_ms, Some(5000));
    assert!(matches!(cli.command, Command::Start(_)));
}

#[test]
fn parses_history_with_level_and_limit() {
    let cli = Cli::try_parse_from(["vaultsync", "history", "--level", "warning", "--limit", "10"]).unwrap();
    match cli.command {
        Command::History(history) => {
            assert_eq!(history.level, "warning");
            assert_eq!(history.limit, 10);
        }
        other => panic!("expected History, got {other:?}"),
    }
}

#[test]
fn parses_settings_set_subcommand() {
    let cli = Cli::try_parse_from(["vaultsync", "settings", "set", "fetch-interval-ms", "1000"]).unwrap();
    match cli.command {
        Command::Settings(vaultsync_daemon::cli::commands::settings::Settings::Set { key, value }) => {
            assert_eq!(key, "fetch-interval-ms");
            assert_eq!(value, "1000");
        }
        other => panic!("expected Settings::Set, got {other:?}"),
    }
}

#[test]
fn rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["vaultsync", "nonsense"]).is_err());
}
