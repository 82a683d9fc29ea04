// bloodhound - sniffing reverse proxy
//
// Forwards every inbound request to a single upstream target, assigns each
// one a correlation ID, logs the request/response/completed phases as
// structured events, and optionally writes full dumps of both messages
// ("bones") to disk.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bloodhound::cli::Cli;
use bloodhound::config::Config;
use bloodhound::start_proxy;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bloodhound=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Resolve configuration: flags > env > file > defaults
    let config = cli.apply(Config::from_env());
    config.validate()?;

    tracing::info!(
        listen = %config.listen_addr,
        target = %config.target_url,
        bones = config.bone_dir.is_some(),
        "Configuration loaded"
    );

    // Bind before serving; an unavailable address must stop the process here
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    // Ctrl-C triggers graceful shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(());
        }
    });

    start_proxy(config, listener, shutdown_rx).await
}
