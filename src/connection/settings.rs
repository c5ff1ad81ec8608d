// src/connection/settings.rs

//! Per-connection settings resolved once when a client is accepted.

use crate::config::Config;
use crate::core::protocol::frame::DEFAULT_MAX_FRAME_SIZE;
use std::net::SocketAddr;
use std::time::Duration;

/// Everything a connection needs from the server configuration, resolved for
/// one specific client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// How long the client may stay silent before it is disconnected.
    pub idle_timeout: Duration,
    /// Frames declaring a larger payload abort the connection.
    pub max_frame_size: usize,
    /// The origin announced with every registration, e.g. `ProtoBuffer@10.0.0.7`.
    pub origin: String,
    /// Smoothing configuration id passed to the engine on registration.
    pub smoothing_cfg: u32,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config, addr: SocketAddr) -> Self {
        Self {
            idle_timeout: config.idle_timeout,
            max_frame_size: config.max_frame_size,
            origin: format!("{}@{}", config.origin, addr.ip()),
            smoothing_cfg: config.smoothing_cfg,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            origin: "ProtoBuffer".to_string(),
            smoothing_cfg: 0,
        }
    }
}
