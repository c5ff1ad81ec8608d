// src/server/initialization.rs

//! Handles server initialization: shared state, the engine channel and the listener.

use super::context::{ServerContext, ServerState};
use super::registry::ConnectionRegistry;
use crate::config::Config;
use crate::core::engine::EngineHandle;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);
    let (engine, engine_rx) = EngineHandle::channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!(
        "Protobuf server listening on {}:{}",
        config.host, config.port
    );
    let connection_permits = Arc::new(Semaphore::new(config.max_clients));

    let state = Arc::new(ServerState {
        config,
        engine,
        connections: ConnectionRegistry::new(),
    });

    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
        connection_permits,
        engine_rx: Some(engine_rx),
        events_tx,
        events_rx,
    })
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Idle timeout {:?}, max frame size {} bytes, max clients {}.",
        config.idle_timeout, config.max_frame_size, config.max_clients
    );
    info!(
        "Registrations announce origin '{}' with smoothing config {}.",
        config.origin, config.smoothing_cfg
    );
}
