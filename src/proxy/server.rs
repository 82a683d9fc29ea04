//! Proxy server setup and initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::any, Router};
use tokio::net::TcpListener;

use crate::bones::BoneWriter;
use crate::config::Config;
use crate::correlate::RequestCorrelator;
use crate::sniff::{LogSniffer, Sniffer};

use super::{proxy_handler, ProxyState};

/// Build the shared proxy state from a resolved configuration.
pub(crate) fn build_state(config: &Config) -> Result<ProxyState> {
    // Forwarding client with timeout and connection pooling.
    // NOTE: No default User-Agent is set - the caller's own headers pass
    // through untouched so the upstream sees the original client.
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .pool_max_idle_per_host(10)
        // Relay redirects to the caller instead of chasing them
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to create HTTP client")?;

    let target = reqwest::Url::parse(&config.target_url)
        .with_context(|| format!("Invalid target URL: {}", config.target_url))?;
    let target_host = match target.port() {
        Some(port) => format!("{}:{}", target.host_str().unwrap_or_default(), port),
        None => target.host_str().unwrap_or_default().to_string(),
    };

    // Sniffers composed at construction time: structured logging always,
    // the bone writer only when a directory is configured
    let mut sniffers: Vec<Box<dyn Sniffer>> = vec![Box::new(LogSniffer)];
    if let Some(dir) = &config.bone_dir {
        sniffers.push(Box::new(BoneWriter::new(dir.clone())));
    }

    Ok(ProxyState {
        client,
        target_url: config.target_url.trim_end_matches('/').to_string(),
        target_host,
        correlator: Arc::new(RequestCorrelator::new()),
        sniffers: Arc::new(sniffers),
    })
}

/// Run the proxy on an already-bound listener until the shutdown signal
/// fires. The caller binds the listener, so an unavailable address is
/// fatal before any request handling starts (and tests can bind port 0).
pub async fn start_proxy(
    config: Config,
    listener: TcpListener,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<()> {
    let state = build_state(&config)?;

    // All requests go to the proxy handler, the root included
    let app = Router::new()
        .route("/", any(proxy_handler))
        .route("/*path", any(proxy_handler))
        .with_state(state)
        .into_make_service_with_connect_info::<SocketAddr>();

    let addr = listener
        .local_addr()
        .context("Listener has no local address")?;
    tracing::info!("Starting reverse proxy on {}, proxying to {}", addr, config.target_url);
    if let Some(dir) = &config.bone_dir {
        tracing::info!("Sniffed bones will be written to {}", dir.display());
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.await.ok();
        })
        .await
        .context("Server error")?;

    tracing::info!("Proxy server shut down gracefully");
    Ok(())
}
