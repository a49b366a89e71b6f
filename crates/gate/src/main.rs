// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};

use tokengate::config::GateConfig;
use tokengate::manager::{TokenEvent, TokenLifecycleManager};
use tokengate::store::FileStore;

#[tokio::main]
async fn main() {
    let config = GateConfig::parse();

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: GateConfig) -> anyhow::Result<()> {
    // reqwest is built with rustls-no-provider; install ring once.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let store = Arc::new(FileStore::open(&config.store_path));
    let manager = TokenLifecycleManager::new(config, store);

    // Log lifecycle events as they happen.
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TokenEvent::Refreshed { timestamp_ms, .. }) => {
                    info!(timestamp_ms, "token refreshed");
                }
                Ok(TokenEvent::RefreshFailed { error, timestamp_ms }) => {
                    info!(timestamp_ms, "token refresh failed: {error}");
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    manager.auto_start();

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    manager.stop();
    Ok(())
}
