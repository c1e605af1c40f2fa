use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use firefly_relay::{
    api::{self, ApiState},
    broadcast,
    config::Config,
    mailbox::StatusMailbox,
    registry::SubscriberRegistry,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "firefly-relay")]
#[command(about = "Always-on status telemetry relay")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "firefly-relay.toml")]
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

    let mailbox = Arc::new(StatusMailbox::new(config.relay.queue_capacity));
    let registry = SubscriberRegistry::new(Arc::clone(&mailbox));
    let state = ApiState::new(Arc::clone(&mailbox), registry.clone());

    let cancel = CancellationToken::new();

    let broadcast_task = tokio::spawn(broadcast::run(
        mailbox,
        registry,
        config.relay.broadcast_options(),
        cancel.clone(),
    ));

    let app = api::router(state);
    let listener = TcpListener::bind(config.server.http_addr).await?;
    info!(http_addr = %config.server.http_addr, "Relay listening");

    let cancel_clone = cancel.clone();
    tokio::select! {
        result = axum::serve(listener, app).with_graceful_shutdown(async move {
            cancel_clone.cancelled().await;
        }) => {
            if let Err(e) = result {
                tracing::error!(error = ?e, "HTTP server error");
            }
            info!("HTTP server shut down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    }

    cancel.cancel();
    let _ = broadcast_task.await;

    Ok(())
}
