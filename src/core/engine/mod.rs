// src/core/engine/mod.rs

//! The boundary between client connections and the shared lighting engine.
//!
//! Connections only ever talk to the engine through the [`Engine`] trait. Every
//! call is a one-way, non-blocking request; the only signal that flows back into
//! a connection is a priority revocation, delivered on that connection's
//! [`RevocationSender`].

pub mod handle;
pub mod registry;

pub use handle::{EngineHandle, EngineRequest};
pub use registry::{InputRegistry, InputValue, RegisteredInput};

use crate::core::color::{ColorRgb, Image};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Carries priorities the engine has released on a connection's behalf.
pub type RevocationSender = mpsc::UnboundedSender<i32>;
pub type RevocationReceiver = mpsc::UnboundedReceiver<i32>;

/// Identifies the connection that owns a registered priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of input a priority claim carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Color,
    Image,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Color => "COLOR",
            Component::Image => "IMAGE",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons the engine refuses a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("image is empty")]
    EmptyImage,
    #[error("engine is not running")]
    Unavailable,
    #[error("{0}")]
    Rejected(String),
}

/// Requests the connection layer can issue to the shared engine.
///
/// Implementations must not block: a connection calls these from its own task
/// and never waits for the engine to act on them.
pub trait Engine: Send + Sync {
    /// Announces a priority claim for `component` on behalf of `owner`.
    fn register_priority(
        &self,
        priority: i32,
        component: Component,
        origin: &str,
        owner: ConnectionId,
        smoothing_cfg: u32,
    );

    fn clear_priority(&self, priority: i32);

    fn clear_all_priorities(&self, force: bool);

    /// Forwards an image. This is the one call whose outcome the caller sees.
    fn set_image(
        &self,
        priority: i32,
        image: Image,
        timeout_ms: Option<i32>,
        clear_effect: bool,
    ) -> Result<(), EngineError>;

    fn set_color(
        &self,
        priority: i32,
        color: ColorRgb,
        timeout_ms: Option<i32>,
        origin: &str,
        clear_effects: bool,
    );
}
