// src/core/engine/handle.rs

//! A cloneable, channel-backed [`Engine`] implementation.

use super::{Component, ConnectionId, Engine, EngineError, RevocationSender};
use crate::core::color::{ColorRgb, Image};
use tokio::sync::mpsc;
use tracing::warn;

/// A single request queued for the engine task.
#[derive(Debug)]
pub enum EngineRequest {
    /// A connection came up and wants to hear about revocations.
    Attach {
        owner: ConnectionId,
        revocations: RevocationSender,
    },
    /// A connection went away.
    Detach { owner: ConnectionId },
    Register {
        priority: i32,
        component: Component,
        origin: String,
        owner: ConnectionId,
        smoothing_cfg: u32,
    },
    Clear { priority: i32 },
    ClearAll { force: bool },
    SetColor {
        priority: i32,
        color: ColorRgb,
        timeout_ms: Option<i32>,
        origin: String,
        clear_effects: bool,
    },
    SetImage {
        priority: i32,
        image: Image,
        timeout_ms: Option<i32>,
        clear_effect: bool,
    },
}

impl EngineRequest {
    pub fn name(&self) -> &'static str {
        match self {
            EngineRequest::Attach { .. } => "attach",
            EngineRequest::Detach { .. } => "detach",
            EngineRequest::Register { .. } => "register",
            EngineRequest::Clear { .. } => "clear",
            EngineRequest::ClearAll { .. } => "clearall",
            EngineRequest::SetColor { .. } => "color",
            EngineRequest::SetImage { .. } => "image",
        }
    }
}

/// Sends engine requests over an unbounded channel so callers never block.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineRequest>,
}

impl EngineHandle {
    /// Creates a handle together with the receiving end for the engine task.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn attach(&self, owner: ConnectionId, revocations: RevocationSender) {
        self.send(EngineRequest::Attach { owner, revocations });
    }

    pub fn detach(&self, owner: ConnectionId) {
        self.send(EngineRequest::Detach { owner });
    }

    fn send(&self, request: EngineRequest) -> bool {
        if let Err(e) = self.tx.send(request) {
            warn!("Engine is not running, dropping {} request.", e.0.name());
            return false;
        }
        true
    }
}

impl Engine for EngineHandle {
    fn register_priority(
        &self,
        priority: i32,
        component: Component,
        origin: &str,
        owner: ConnectionId,
        smoothing_cfg: u32,
    ) {
        self.send(EngineRequest::Register {
            priority,
            component,
            origin: origin.to_string(),
            owner,
            smoothing_cfg,
        });
    }

    fn clear_priority(&self, priority: i32) {
        self.send(EngineRequest::Clear { priority });
    }

    fn clear_all_priorities(&self, force: bool) {
        self.send(EngineRequest::ClearAll { force });
    }

    fn set_image(
        &self,
        priority: i32,
        image: Image,
        timeout_ms: Option<i32>,
        clear_effect: bool,
    ) -> Result<(), EngineError> {
        if image.is_empty() {
            return Err(EngineError::EmptyImage);
        }
        if self.send(EngineRequest::SetImage {
            priority,
            image,
            timeout_ms,
            clear_effect,
        }) {
            Ok(())
        } else {
            Err(EngineError::Unavailable)
        }
    }

    fn set_color(
        &self,
        priority: i32,
        color: ColorRgb,
        timeout_ms: Option<i32>,
        origin: &str,
        clear_effects: bool,
    ) {
        self.send(EngineRequest::SetColor {
            priority,
            color,
            timeout_ms,
            origin: origin.to_string(),
            clear_effects,
        });
    }
}
