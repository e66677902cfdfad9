//! camsync-rs — change-feed synchronization agent for camera-cloud video
//! clips.
//!
//! Once credentials are published on the agent bus, a background scheduler
//! periodically polls the service for clips created or changed since the
//! persisted checkpoint, downloads whatever is missing locally into a
//! date-derived folder layout, and advances the checkpoint per item so a
//! failed batch resumes exactly where it stopped.

#![warn(clippy::all)]

mod cli;
mod config;
mod download;
mod events;
mod feed;
mod retry;
mod settings;
mod shutdown;
mod sync;
mod types;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::download::HttpDownloader;
use crate::events::{AgentEvent, EventBus};
use crate::feed::HttpChangeFeed;
use crate::retry::RetryPolicy;
use crate::settings::{SqliteSettingsStore, SyncSettings};
use crate::sync::{ActivationGate, SyncEngine};
use crate::types::{Credentials, LogLevel, SharedCredentials};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let filter = match cli.log_level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let data_dir = config::expand_tilde(&cli.data_dir);
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;

    let store = Arc::new(SqliteSettingsStore::open(&data_dir.join("camsync.db")).await?);
    let settings = SyncSettings::new(store);
    let sync_config = config::SyncConfig::load(&settings, &cli).await?;

    tokio::fs::create_dir_all(&sync_config.output_root)
        .await
        .with_context(|| format!("creating output root {}", sync_config.output_root.display()))?;
    tracing::info!(
        output = %sync_config.output_root.display(),
        interval_secs = sync_config.poll_interval.as_secs(),
        "starting camsync-rs"
    );

    let credentials = Credentials {
        host: cli.host.clone(),
        port: cli.port,
        token: cli.token.clone(),
    };

    let engine = Arc::new(SyncEngine::new(
        settings,
        Arc::new(HttpChangeFeed::new()),
        Arc::new(HttpDownloader::new(RetryPolicy::default())),
        SharedCredentials::new(),
        sync_config,
    ));

    if cli.once {
        engine.credentials().replace(credentials).await;
        let stats = engine.poll().await?;
        tracing::info!(
            downloaded = stats.downloaded,
            skipped = stats.skipped,
            aborted = stats.aborted,
            "single poll cycle complete"
        );
        return Ok(());
    }

    // The gate must subscribe before the credential event is published.
    let bus = EventBus::default();
    let gate = ActivationGate::spawn(bus.subscribe(), engine);
    bus.publish(AgentEvent::CredentialsAvailable(credentials));

    let shutdown_token = shutdown::install_signal_handler();
    shutdown_token.cancelled().await;
    tracing::info!("shutting down, waiting for the sync scheduler to stop");
    gate.stop().await;

    Ok(())
}
