// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;

mod connection_loop;
mod context;
mod initialization;
mod metrics_server;
mod registry;
mod spawner;

pub use context::ServerState;
pub use registry::ConnectionRegistry;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config) -> Result<()> {
    // 1. Bind the listener and build the shared state.
    let mut server_context = initialization::setup(config).await?;

    // 2. Start the engine and the optional metrics endpoint.
    spawner::spawn_all(&mut server_context).await?;

    // 3. Accept connections until shutdown.
    connection_loop::run(server_context).await
}
