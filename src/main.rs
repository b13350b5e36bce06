//! Offline Cache - maintenance host
//!
//! Opens the durable store, reports its storage usage and keeps the expiry
//! sweep running until the process is asked to stop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_cache::{spawn_cleanup_task, Config, OfflineCache, StoreHandle};

/// Main entry point for the offline cache host.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the store and create missing collections
/// 4. Log storage usage
/// 5. Start background expiry sweep
/// 6. Stop the sweep gracefully on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting offline cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: store_dir={}, cleanup_interval={}s",
        config.store_dir.display(),
        config.cleanup_interval
    );

    let cache = OfflineCache::new(Arc::new(StoreHandle::new(&config.store_dir)));
    cache
        .initialize()
        .await
        .with_context(|| format!("failed to open store at {}", config.store_dir.display()))?;

    let storage = cache.storage_info().await;
    info!(
        "Storage: used={} bytes, available={} bytes, quota={} bytes",
        storage.used, storage.available, storage.quota
    );

    let cleanup = spawn_cleanup_task(cache.clone(), Duration::from_secs(config.cleanup_interval));
    info!("Background expiry sweep started");

    shutdown_signal().await.context("failed to listen for shutdown signal")?;

    cleanup.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
