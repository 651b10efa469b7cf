//! rotalog Daemon - configured logger with signal-driven level changes

use anyhow::Result;
use clap::Parser;
use rotalog::{CancellationToken, LevelController};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod daemon;

use cli::Cli;
use daemon::Heartbeat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Bootstrap logging until the configured logger is installed
    let config = {
        let _bootstrap = tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "rotalogd=info,rotalog=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .set_default();

        let config = cli.log_config()?;
        info!("Loaded log config: {:?}", config);
        config
    };

    let logger = rotalog::init_logger(&config)?;
    info!("rotalogd starting with {:?}", logger);

    let cancel = CancellationToken::new();
    let controller = LevelController::new(logger.clone()).spawn(cancel.clone())?;

    let heartbeat = Heartbeat::new(
        logger.clone(),
        Duration::from_millis(cli.interval_ms),
        cli.count,
    );

    // Set up signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = heartbeat.run() => {
            info!("Heartbeat count reached, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    cancel.cancel();
    controller.await?;

    info!("rotalogd shutdown complete");
    Ok(())
}
