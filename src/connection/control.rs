// src/connection/control.rs

//! The handles through which the owning server talks to a running connection,
//! and the notification it gets back when the connection ends.

use crate::core::engine::{ConnectionId, RevocationSender};
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Why a connection was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer closed the socket or reset it.
    PeerClosed,
    /// No command arrived within the idle timeout.
    IdleTimeout,
    /// The owner called [`ConnectionControl::force_close`].
    ForceClosed,
    /// The server is shutting down.
    ServerShutdown,
    /// An oversized frame or an undecodable payload.
    ProtocolViolation,
    /// A socket read or write failed.
    TransportError,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisconnectReason::PeerClosed => "closed by peer",
            DisconnectReason::IdleTimeout => "idle timeout",
            DisconnectReason::ForceClosed => "force closed",
            DisconnectReason::ServerShutdown => "server shutdown",
            DisconnectReason::ProtocolViolation => "protocol violation",
            DisconnectReason::TransportError => "transport error",
        };
        f.write_str(s)
    }
}

/// Emitted exactly once per connection, after its transport is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEnded {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    pub reason: DisconnectReason,
}

/// A cloneable remote control for one connection.
#[derive(Debug, Clone)]
pub struct ConnectionControl {
    id: ConnectionId,
    addr: SocketAddr,
    tx: mpsc::UnboundedSender<DisconnectReason>,
    revocations: RevocationSender,
}

impl ConnectionControl {
    pub(crate) fn new(
        id: ConnectionId,
        addr: SocketAddr,
        tx: mpsc::UnboundedSender<DisconnectReason>,
        revocations: RevocationSender,
    ) -> Self {
        Self {
            id,
            addr,
            tx,
            revocations,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Asks the connection to close its socket and tear down. Has no effect if
    /// the connection already ended.
    pub fn force_close(&self) {
        self.close(DisconnectReason::ForceClosed);
    }

    /// Closes the connection, recording `reason` in its `ConnectionEnded` event.
    pub fn close(&self, reason: DisconnectReason) {
        let _ = self.tx.send(reason);
    }

    /// Tells the connection that the engine released `priority`.
    pub fn revoke(&self, priority: i32) {
        let _ = self.revocations.send(priority);
    }

    /// A sender the engine can keep to deliver revocations on its own.
    pub fn revocation_sender(&self) -> RevocationSender {
        self.revocations.clone()
    }

    /// Returns true once the connection task has finished.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
