use clap::Parser;
use vaultsync_daemon::cli::{self, Cli};
use vaultsync_daemon::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log.as_deref().unwrap_or("info"));

    if let Err(err) = cli::run(cli).await {
        tracing::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    Ok(())
}
