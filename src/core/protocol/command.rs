// src/core/protocol/command.rs

//! Decodes protobuf request payloads into [`IncomingCommand`] values.

use super::message::{HyperionRequest, hyperion_request};
use crate::core::ProtoServerError;
use crate::core::color::ColorRgb;
use bytes::Bytes;
use prost::Message as ProstMessage;

/// A single decoded client command.
///
/// `duration_ms` is `None` when the client did not send one, which the engine
/// treats as "no timeout".
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingCommand {
    SetColor {
        priority: i32,
        rgb: ColorRgb,
        duration_ms: Option<i32>,
    },
    SetImage {
        priority: i32,
        width: i32,
        height: i32,
        pixel_data: Bytes,
        duration_ms: Option<i32>,
        clear_effect: bool,
    },
    Clear {
        priority: i32,
    },
    ClearAll {
        force: bool,
    },
    /// A well-formed request carrying an unknown or absent command tag.
    Unrecognized(i32),
}

impl IncomingCommand {
    /// Parses one frame payload.
    ///
    /// Returns `DecodeFailure` if the payload is not a valid request. A valid
    /// request with an unknown command tag yields `Unrecognized`, which is not an
    /// error at this stage.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtoServerError> {
        let request = HyperionRequest::decode(payload)?;
        Self::try_from(request)
    }

    /// The lowercase command name, used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            IncomingCommand::SetColor { .. } => "color",
            IncomingCommand::SetImage { .. } => "image",
            IncomingCommand::Clear { .. } => "clear",
            IncomingCommand::ClearAll { .. } => "clearall",
            IncomingCommand::Unrecognized(_) => "unrecognized",
        }
    }
}

impl TryFrom<HyperionRequest> for IncomingCommand {
    type Error = ProtoServerError;

    fn try_from(request: HyperionRequest) -> Result<Self, ProtoServerError> {
        // An absent tag is reported as tag 0, which no command uses.
        let tag = request.command.unwrap_or(0);
        let Ok(command) = hyperion_request::Command::try_from(tag) else {
            return Ok(IncomingCommand::Unrecognized(tag));
        };

        match command {
            hyperion_request::Command::Color => {
                let color = request
                    .color_request
                    .ok_or_else(|| missing_body("colorRequest"))?;
                Ok(IncomingCommand::SetColor {
                    priority: color.priority,
                    rgb: ColorRgb::from_packed(color.rgb_color),
                    duration_ms: color.duration,
                })
            }
            hyperion_request::Command::Image => {
                let image = request
                    .image_request
                    .ok_or_else(|| missing_body("imageRequest"))?;
                Ok(IncomingCommand::SetImage {
                    priority: image.priority,
                    width: image.imagewidth,
                    height: image.imageheight,
                    pixel_data: image.imagedata,
                    duration_ms: image.duration,
                    clear_effect: image.clear_effect.unwrap_or(false),
                })
            }
            hyperion_request::Command::Clear => {
                let clear = request
                    .clear_request
                    .ok_or_else(|| missing_body("clearRequest"))?;
                Ok(IncomingCommand::Clear {
                    priority: clear.priority,
                })
            }
            // The clear-all body is optional; older clients never send one.
            hyperion_request::Command::Clearall => Ok(IncomingCommand::ClearAll {
                force: request
                    .clearall_request
                    .and_then(|c| c.force)
                    .unwrap_or(false),
            }),
        }
    }
}

fn missing_body(field: &str) -> ProtoServerError {
    ProtoServerError::DecodeFailure(format!("missing required field '{field}'"))
}
