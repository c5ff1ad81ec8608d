// src/connection/registration.rs

//! Tracks the single priority a connection has announced to the engine.

use crate::core::engine::{Component, ConnectionId, Engine};
use crate::core::metrics;
use tracing::debug;

/// The connection's current priority claim.
///
/// A priority is announced lazily, the first time a color or image is sent for
/// it, and only re-announced after the claim changes or the engine revokes it.
#[derive(Debug)]
pub struct PriorityRegistration {
    owner: ConnectionId,
    smoothing_cfg: u32,
    current: Option<i32>,
}

impl PriorityRegistration {
    pub fn new(owner: ConnectionId, smoothing_cfg: u32) -> Self {
        Self {
            owner,
            smoothing_cfg,
            current: None,
        }
    }

    /// The registered priority, or `None` before the first registration and
    /// after a matching revocation.
    pub fn current(&self) -> Option<i32> {
        self.current
    }

    /// Registers `priority` with the engine unless it is already the tracked
    /// claim. Returns whether a registration was sent.
    pub fn maybe_register(
        &mut self,
        engine: &dyn Engine,
        priority: i32,
        component: Component,
        origin: &str,
    ) -> bool {
        if self.current == Some(priority) {
            return false;
        }
        debug!(
            "Connection {}: registering priority {} ({}), previous {:?}.",
            self.owner, priority, component, self.current
        );
        engine.register_priority(priority, component, origin, self.owner, self.smoothing_cfg);
        metrics::REGISTRATIONS_TOTAL.inc();
        self.current = Some(priority);
        true
    }

    /// Forgets the claim if it matches `priority`. Any other value is ignored,
    /// so this is safe to call at any time and any number of times.
    pub fn revoke(&mut self, priority: i32) -> bool {
        if self.current != Some(priority) {
            return false;
        }
        self.current = None;
        true
    }
}
