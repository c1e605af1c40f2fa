use std::path::PathBuf;

use clap::Parser;
use firefly_reporter::{
    adapter::HttpAdapter,
    config::Config,
    indicator::LogIndicator,
    reporter::Reporter,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "firefly-reporter")]
#[command(about = "Device-side status reporter")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "firefly-reporter.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(
        relay = %config.relay.url,
        device = %config.reporter.device_label,
        "Starting reporter"
    );

    let adapter = HttpAdapter::new(
        &config.relay.url,
        config.network.clone(),
        config.reporter.request_timeout(),
    )?;
    let reporter = Reporter::new(
        adapter,
        LogIndicator,
        config.reporter.reporter_options(),
    );

    let cancel = CancellationToken::new();

    tokio::select! {
        _ = reporter.run(cancel.clone()) => {
            info!("Reporter loop ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    }

    Ok(())
}
