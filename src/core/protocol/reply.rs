// src/core/protocol/reply.rs

//! Builds the acknowledgement sent back for every dispatched command.

use super::frame::encode_frame;
use super::message::{HyperionReply, hyperion_reply};
use crate::core::ProtoServerError;
use bytes::Bytes;
use prost::Message as ProstMessage;

/// The outcome of a single command, as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingReply {
    Success,
    Error(String),
}

impl OutgoingReply {
    pub fn error(message: impl Into<String>) -> Self {
        OutgoingReply::Error(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutgoingReply::Success)
    }

    /// Serializes the reply into a protobuf payload without framing.
    pub fn to_payload(&self) -> Bytes {
        let message = HyperionReply::from(self);
        Bytes::from(message.encode_to_vec())
    }

    /// Serializes the reply into a complete, length-prefixed wire frame.
    pub fn to_frame(&self) -> Result<Bytes, ProtoServerError> {
        encode_frame(&self.to_payload())
    }
}

impl From<&OutgoingReply> for HyperionReply {
    fn from(reply: &OutgoingReply) -> Self {
        match reply {
            OutgoingReply::Success => HyperionReply {
                r#type: Some(hyperion_reply::Type::Reply as i32),
                success: Some(true),
                error: None,
            },
            OutgoingReply::Error(message) => HyperionReply {
                r#type: Some(hyperion_reply::Type::Reply as i32),
                success: Some(false),
                error: Some(message.clone()),
            },
        }
    }
}

/// Converts a command-level error into the reply the client sees.
impl From<&ProtoServerError> for OutgoingReply {
    fn from(e: &ProtoServerError) -> Self {
        OutgoingReply::Error(e.to_string())
    }
}

impl TryFrom<HyperionReply> for OutgoingReply {
    type Error = ProtoServerError;

    /// Interprets a decoded reply; used by clients and tests.
    fn try_from(reply: HyperionReply) -> Result<Self, ProtoServerError> {
        match reply.success {
            Some(true) => Ok(OutgoingReply::Success),
            Some(false) => Ok(OutgoingReply::Error(reply.error.unwrap_or_default())),
            None => Err(ProtoServerError::DecodeFailure(
                "reply is missing the 'success' field".to_string(),
            )),
        }
    }
}
