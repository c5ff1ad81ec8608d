// src/core/protocol/mod.rs

pub mod command;
pub mod frame;
pub mod message;
pub mod reply;

pub use command::IncomingCommand;
pub use frame::{FrameCodec, FrameReassembler};
pub use reply::OutgoingReply;
