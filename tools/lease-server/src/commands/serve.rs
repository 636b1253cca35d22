//! Run the lease HTTP server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use lease_core::{LeaseManager, LeaseStore, MemoryStore, RedisStore};

use super::ServeArgs;
use crate::api::{self, AppState};
use crate::config::{ServerConfig, StoreBackend};
use crate::context::Context;

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let config = effective_config(&args, &ctx.config);
    config.validate().context("Invalid configuration")?;

    let store = build_store(&config, Duration::from_secs(args.purge_interval.max(1))).await?;
    let manager = LeaseManager::new(store, config.lease_config());
    let app = api::router(AppState {
        manager,
        log: config.log.clone(),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    ctx.output.success(&format!("Listening on http://{}", addr));
    if ctx.output.is_verbose() {
        ctx.output.kv("store", &describe_store(&config));
        ctx.output.kv("ttl_secs", &config.lease.ttl_secs.to_string());
        ctx.output.kv("write_mode", &config.lease.write_mode.to_string());
    }
    tracing::info!(
        %addr,
        store = %describe_store(&config),
        ttl_secs = config.lease.ttl_secs,
        write_mode = %config.lease.write_mode,
        "lease server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("lease server stopped");
    Ok(())
}

/// Apply command-line overrides on top of the loaded configuration.
fn effective_config(args: &ServeArgs, base: &ServerConfig) -> ServerConfig {
    let mut config = base.clone();
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.memory {
        config.store.backend = StoreBackend::Memory;
    }
    config
}

fn describe_store(config: &ServerConfig) -> String {
    match config.store.backend {
        StoreBackend::Redis => RedisStore::url(&config.store.host, config.store.port),
        StoreBackend::Memory => "memory".to_string(),
    }
}

async fn build_store(config: &ServerConfig, purge_every: Duration) -> Result<Arc<dyn LeaseStore>> {
    match config.store.backend {
        StoreBackend::Redis => {
            let url = RedisStore::url(&config.store.host, config.store.port);
            let store = RedisStore::connect(&url)
                .await
                .with_context(|| format!("Failed to connect to {}", url))?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            tracing::warn!("memory store is process-local; leases are not shared");
            let store = Arc::new(MemoryStore::new());
            spawn_purge(Arc::clone(&store), purge_every);
            Ok(store as Arc<dyn LeaseStore>)
        }
    }
}

/// Periodically drop expired entries so idle pages do not accumulate.
fn spawn_purge(store: Arc<MemoryStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "purged expired leases");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
