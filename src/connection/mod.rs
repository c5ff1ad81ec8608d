// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: frame reassembly,
//! command dispatch, priority registration and the idle timeout.

mod control;
mod dispatcher;
mod guard;
mod handler;
mod idle;
mod registration;
mod settings;

// Publicly re-export the primary types from the sub-modules.
pub use control::{ConnectionControl, ConnectionEnded, DisconnectReason};
pub use dispatcher::CommandDispatcher;
pub use handler::ConnectionHandler;
pub use idle::IdleTimeout;
pub use registration::PriorityRegistration;
pub use settings::ConnectionSettings;
