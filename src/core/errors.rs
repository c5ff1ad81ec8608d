// src/core/errors.rs

//! Defines the primary error type for the entire application.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum, representing all possible failures within a client connection.
///
/// Variants split into two groups: connection-fatal errors (framing, decoding, transport)
/// that end the session without a reply, and command-level errors that are reported
/// to the client as an error reply while the session stays open.
#[derive(Error, Debug)]
pub enum ProtoServerError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Frame of {len} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Unable to parse message: {0}")]
    DecodeFailure(String),

    #[error("not implemented")]
    UnsupportedCommand,

    #[error("Size of image data does not match with the width and height")]
    ImageSizeMismatch { expected: usize, actual: usize },

    #[error("Unable to set image: {0}")]
    EngineRejected(String),
}

impl ProtoServerError {
    /// Returns true if the error must terminate the connection instead of being
    /// reported back to the client.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProtoServerError::Io(_)
                | ProtoServerError::FrameTooLarge { .. }
                | ProtoServerError::DecodeFailure(_)
        )
    }

    /// A short, stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtoServerError::Io(_) => "io",
            ProtoServerError::FrameTooLarge { .. } => "frame_too_large",
            ProtoServerError::DecodeFailure(_) => "decode_failure",
            ProtoServerError::UnsupportedCommand => "unsupported_command",
            ProtoServerError::ImageSizeMismatch { .. } => "image_size_mismatch",
            ProtoServerError::EngineRejected(_) => "engine_rejected",
        }
    }
}

// Manual implementation of Clone because `std::io::Error` is not cloneable.
impl Clone for ProtoServerError {
    fn clone(&self) -> Self {
        match self {
            ProtoServerError::Io(e) => ProtoServerError::Io(Arc::clone(e)),
            ProtoServerError::FrameTooLarge { len, max } => ProtoServerError::FrameTooLarge {
                len: *len,
                max: *max,
            },
            ProtoServerError::DecodeFailure(s) => ProtoServerError::DecodeFailure(s.clone()),
            ProtoServerError::UnsupportedCommand => ProtoServerError::UnsupportedCommand,
            ProtoServerError::ImageSizeMismatch { expected, actual } => {
                ProtoServerError::ImageSizeMismatch {
                    expected: *expected,
                    actual: *actual,
                }
            }
            ProtoServerError::EngineRejected(s) => ProtoServerError::EngineRejected(s.clone()),
        }
    }
}

impl PartialEq for ProtoServerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ProtoServerError::Io(e1), ProtoServerError::Io(e2)) => e1.kind() == e2.kind(),
            (
                ProtoServerError::FrameTooLarge { len: l1, max: m1 },
                ProtoServerError::FrameTooLarge { len: l2, max: m2 },
            ) => l1 == l2 && m1 == m2,
            (ProtoServerError::DecodeFailure(s1), ProtoServerError::DecodeFailure(s2)) => s1 == s2,
            (
                ProtoServerError::ImageSizeMismatch {
                    expected: e1,
                    actual: a1,
                },
                ProtoServerError::ImageSizeMismatch {
                    expected: e2,
                    actual: a2,
                },
            ) => e1 == e2 && a1 == a2,
            (ProtoServerError::EngineRejected(s1), ProtoServerError::EngineRejected(s2)) => {
                s1 == s2
            }
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ProtoServerError {
    fn from(e: std::io::Error) -> Self {
        ProtoServerError::Io(Arc::new(e))
    }
}

impl From<prost::DecodeError> for ProtoServerError {
    fn from(e: prost::DecodeError) -> Self {
        ProtoServerError::DecodeFailure(e.to_string())
    }
}

impl From<crate::core::engine::EngineError> for ProtoServerError {
    fn from(e: crate::core::engine::EngineError) -> Self {
        ProtoServerError::EngineRejected(e.to_string())
    }
}
