// src/core/mod.rs

//! The central module containing the protocol, engine boundary and shared types.

pub mod color;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod protocol;

pub use errors::ProtoServerError;
pub use protocol::{IncomingCommand, OutgoingReply};
