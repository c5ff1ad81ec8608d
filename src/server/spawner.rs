// src/server/spawner.rs

//! Spawns all of the server's long-running background tasks.

use super::context::ServerContext;
use super::metrics_server;
use crate::core::engine::InputRegistry;
use anyhow::{Result, anyhow};
use tracing::info;

/// Spawns all background tasks into the provided JoinSet.
pub async fn spawn_all(ctx: &mut ServerContext) -> Result<()> {
    let engine_rx = ctx
        .engine_rx
        .take()
        .ok_or_else(|| anyhow!("Engine task was already started"))?;

    // --- Engine ---
    let registry = InputRegistry::new(engine_rx);
    let shutdown_rx_engine = ctx.shutdown_tx.subscribe();
    ctx.background_tasks.spawn(async move {
        registry.run(shutdown_rx_engine).await;
        Ok(())
    });

    // --- Metrics Server ---
    if ctx.state.config.metrics.enabled {
        let port = ctx.state.config.metrics.port;
        let shutdown_rx_metrics = ctx.shutdown_tx.subscribe();
        ctx.background_tasks.spawn(async move {
            metrics_server::run_metrics_server(port, shutdown_rx_metrics).await
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    Ok(())
}
