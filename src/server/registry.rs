// src/server/registry.rs

//! The set of live connections, keyed by connection id.

use crate::connection::{ConnectionControl, DisconnectReason};
use crate::core::engine::ConnectionId;
use dashmap::DashMap;

/// Tracks every running connection so the server can reach it later.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionControl>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, control: ConnectionControl) {
        self.connections.insert(control.id(), control);
    }

    pub fn remove(&self, id: ConnectionId) -> Option<ConnectionControl> {
        self.connections.remove(&id).map(|(_, control)| control)
    }

    pub fn get(&self, id: ConnectionId) -> Option<ConnectionControl> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Asks every live connection to close. Entries stay in the map until each
    /// connection reports that it ended.
    pub fn close_all(&self, reason: DisconnectReason) {
        for entry in self.connections.iter() {
            entry.value().close(reason);
        }
    }
}
