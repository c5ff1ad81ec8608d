// src/server/context.rs

use super::registry::ConnectionRegistry;
use crate::config::Config;
use crate::connection::ConnectionEnded;
use crate::core::engine::{EngineHandle, EngineRequest};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tokio::task::JoinSet;

/// Shared, server-wide state handed to the accept loop and background tasks.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    /// The connection-facing side of the engine.
    pub engine: EngineHandle,
    pub connections: ConnectionRegistry,
}

/// Holds all the initialized state required to run the server's main loop.
pub struct ServerContext {
    pub state: Arc<ServerState>,
    pub listener: TcpListener,
    pub shutdown_tx: broadcast::Sender<()>,
    pub background_tasks: JoinSet<Result<(), anyhow::Error>>,
    pub connection_permits: Arc<Semaphore>,
    /// Taken by the spawner when the engine task starts.
    pub engine_rx: Option<mpsc::UnboundedReceiver<EngineRequest>>,
    pub events_tx: mpsc::UnboundedSender<ConnectionEnded>,
    pub events_rx: mpsc::UnboundedReceiver<ConnectionEnded>,
}
