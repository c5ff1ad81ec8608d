// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::{ServerContext, ServerState};
use crate::connection::{
    ConnectionEnded, ConnectionHandler, ConnectionSettings, DisconnectReason,
};
use crate::core::engine::{ConnectionId, Engine};
use crate::core::metrics;
use anyhow::{Result, anyhow};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// How long shutdown waits for connections and background tasks to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The main server loop that accepts connections and handles graceful shutdown.
pub async fn run(mut ctx: ServerContext) -> Result<()> {
    let mut connection_id_counter: u64 = 0;
    let mut client_tasks = JoinSet::new();
    let engine: Arc<dyn Engine> = Arc::new(ctx.state.engine.clone());

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            Some(ended) = ctx.events_rx.recv() => {
                on_connection_ended(&ctx.state, ended);
            },

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        let Ok(permit) = ctx.connection_permits.clone().try_acquire_owned() else {
                            warn!(
                                "Rejecting connection from {}: max_clients ({}) reached.",
                                addr, ctx.state.config.max_clients
                            );
                            continue;
                        };
                        info!("Accepted new connection from: {}", addr);
                        metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

                        connection_id_counter = connection_id_counter.wrapping_add(1);
                        let id = ConnectionId(connection_id_counter);
                        spawn_connection(&ctx, &mut client_tasks, engine.clone(), socket, addr, id, permit);
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!(
        "Shutting down. Closing {} client connections.",
        ctx.state.connections.len()
    );
    ctx.state
        .connections
        .close_all(DisconnectReason::ServerShutdown);

    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for client connections to close.");
        client_tasks.shutdown().await;
    }
    while let Ok(ended) = ctx.events_rx.try_recv() {
        on_connection_ended(&ctx.state, ended);
    }
    info!("All client connections closed.");

    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No background task was listening for the shutdown signal.");
    }
    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");
    Ok(())
}

/// Builds the handler for an accepted socket, hooks it up to the engine and
/// the registry, and spawns it.
fn spawn_connection(
    ctx: &ServerContext,
    client_tasks: &mut JoinSet<()>,
    engine: Arc<dyn Engine>,
    socket: TcpStream,
    addr: SocketAddr,
    id: ConnectionId,
    permit: OwnedSemaphorePermit,
) {
    if let Err(e) = socket.set_nodelay(true) {
        debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }

    let settings = ConnectionSettings::from_config(&ctx.state.config, addr);
    let (handler, control) =
        ConnectionHandler::new(socket, addr, id, engine, settings, ctx.events_tx.clone());

    ctx.state.engine.attach(id, control.revocation_sender());
    ctx.state.connections.insert(control);

    client_tasks.spawn(async move {
        // Held for the lifetime of the connection.
        let _permit = permit;
        handler.run().await;
    });
}

/// Drops a finished connection from the registry and the engine.
fn on_connection_ended(state: &ServerState, ended: ConnectionEnded) {
    state.connections.remove(ended.id);
    state.engine.detach(ended.id);
    debug!(
        "Connection {} from {} removed ({}); {} still active.",
        ended.id,
        ended.addr,
        ended.reason,
        state.connections.len()
    );
}
