// src/core/engine/registry.rs

//! A minimal engine task that tracks which connection holds which priority.
//!
//! `InputRegistry` does not compose or arbitrate output. It records the latest
//! input per priority and tells connections when their claim is released, so
//! that the next command they send re-announces the priority.

use super::handle::EngineRequest;
use super::{Component, ConnectionId, RevocationSender};
use crate::core::color::ColorRgb;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// The latest value pushed to a registered priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    None,
    Color(ColorRgb),
    Image { width: usize, height: usize },
}

/// One priority slot as seen by the registry.
#[derive(Debug, Clone)]
pub struct RegisteredInput {
    pub owner: ConnectionId,
    pub component: Component,
    pub origin: String,
    pub smoothing_cfg: u32,
    pub value: InputValue,
    /// `None` means the input never expires.
    pub expires_at: Option<Instant>,
}

/// Tracks priority ownership and routes revocations back to connections.
pub struct InputRegistry {
    rx: mpsc::UnboundedReceiver<EngineRequest>,
    clients: HashMap<ConnectionId, RevocationSender>,
    inputs: BTreeMap<i32, RegisteredInput>,
}

impl InputRegistry {
    pub fn new(rx: mpsc::UnboundedReceiver<EngineRequest>) -> Self {
        Self {
            rx,
            clients: HashMap::new(),
            inputs: BTreeMap::new(),
        }
    }

    /// Runs the main loop until shutdown or until every handle is dropped.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        debug!("Input registry task started.");
        loop {
            tokio::select! {
                request = self.rx.recv() => {
                    match request {
                        Some(request) => self.apply(request),
                        None => {
                            info!("All engine handles dropped, input registry stopping.");
                            return;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Input registry shutting down with {} active inputs.", self.inputs.len());
                    return;
                }
            }
        }
    }

    /// Applies a single request. Exposed so the registry can be driven
    /// synchronously.
    pub fn apply(&mut self, request: EngineRequest) {
        trace!("Engine request: {}", request.name());
        match request {
            EngineRequest::Attach { owner, revocations } => {
                self.clients.insert(owner, revocations);
            }
            EngineRequest::Detach { owner } => {
                self.clients.remove(&owner);
                let before = self.inputs.len();
                self.inputs.retain(|_, input| input.owner != owner);
                let released = before - self.inputs.len();
                if released > 0 {
                    debug!("Released {} priorities held by {}.", released, owner);
                }
            }
            EngineRequest::Register {
                priority,
                component,
                origin,
                owner,
                smoothing_cfg,
            } => {
                if let Some(previous) = self.inputs.get(&priority)
                    && previous.owner != owner
                {
                    info!(
                        "Priority {} taken over by {} ({}), releasing it from {}.",
                        priority, owner, origin, previous.owner
                    );
                    self.revoke(previous.owner, priority);
                }
                // A connection holds one priority at a time; moving drops the old slot.
                let before = self.inputs.len();
                self.inputs
                    .retain(|p, input| *p == priority || input.owner != owner);
                if before != self.inputs.len() {
                    debug!("{} moved to priority {}, previous slot released.", owner, priority);
                }
                info!(
                    "Registered priority {} for {} from {} ({}).",
                    priority, component, origin, owner
                );
                self.inputs.insert(
                    priority,
                    RegisteredInput {
                        owner,
                        component,
                        origin,
                        smoothing_cfg,
                        value: InputValue::None,
                        expires_at: None,
                    },
                );
            }
            EngineRequest::Clear { priority } => {
                if let Some(input) = self.inputs.remove(&priority) {
                    debug!("Cleared priority {} ({}).", priority, input.origin);
                    self.revoke(input.owner, priority);
                }
            }
            EngineRequest::ClearAll { force } => {
                debug!(
                    "Clearing all {} priorities (force: {}).",
                    self.inputs.len(),
                    force
                );
                let cleared = std::mem::take(&mut self.inputs);
                for (priority, input) in cleared {
                    self.revoke(input.owner, priority);
                }
            }
            EngineRequest::SetColor {
                priority,
                color,
                timeout_ms,
                ..
            } => {
                self.update(priority, InputValue::Color(color), timeout_ms);
            }
            EngineRequest::SetImage {
                priority,
                image,
                timeout_ms,
                ..
            } => {
                let value = InputValue::Image {
                    width: image.width(),
                    height: image.height(),
                };
                self.update(priority, value, timeout_ms);
            }
        }
    }

    pub fn input(&self, priority: i32) -> Option<&RegisteredInput> {
        self.inputs.get(&priority)
    }

    pub fn active_priorities(&self) -> Vec<i32> {
        self.inputs.keys().copied().collect()
    }

    fn update(&mut self, priority: i32, value: InputValue, timeout_ms: Option<i32>) {
        let Some(input) = self.inputs.get_mut(&priority) else {
            debug!("Ignoring input for unregistered priority {}.", priority);
            return;
        };
        input.value = value;
        input.expires_at = timeout_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Instant::now() + std::time::Duration::from_millis(ms as u64));
    }

    fn revoke(&self, owner: ConnectionId, priority: i32) {
        if let Some(tx) = self.clients.get(&owner)
            && tx.send(priority).is_err()
        {
            debug!("Connection {} is gone, revocation of {} dropped.", owner, priority);
        }
    }
}
