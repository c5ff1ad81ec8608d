// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for connection teardown.

use super::control::{ConnectionEnded, DisconnectReason};
use crate::core::engine::ConnectionId;
use crate::core::metrics;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tracing::debug;

/// An RAII guard that notifies the owner exactly once when a connection
/// handler's scope is exited, whatever the exit path.
pub(crate) struct ConnectionGuard {
    /// The unique identifier for the connection.
    pub(crate) id: ConnectionId,
    /// The network address of the client.
    pub(crate) addr: SocketAddr,
    /// The reason reported to the owner. Starts as `TransportError` so an
    /// unexpected unwind is never reported as a clean close.
    pub(crate) reason: DisconnectReason,
    events: mpsc::UnboundedSender<ConnectionEnded>,
}

impl ConnectionGuard {
    pub(crate) fn new(
        id: ConnectionId,
        addr: SocketAddr,
        events: mpsc::UnboundedSender<ConnectionEnded>,
    ) -> Self {
        metrics::CONNECTED_CLIENTS.inc();
        Self {
            id,
            addr,
            reason: DisconnectReason::TransportError,
            events,
        }
    }

    pub(crate) fn set_reason(&mut self, reason: DisconnectReason) {
        self.reason = reason;
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        metrics::CONNECTED_CLIENTS.dec();
        debug!(
            "ConnectionGuard dropping, connection {} from {} ended ({}).",
            self.id, self.addr, self.reason
        );
        let event = ConnectionEnded {
            id: self.id,
            addr: self.addr,
            reason: self.reason,
        };
        if self.events.send(event).is_err() {
            debug!("Owner of connection {} is gone, end notification dropped.", self.id);
        }
    }
}
