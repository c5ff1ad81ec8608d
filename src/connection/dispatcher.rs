// src/connection/dispatcher.rs

//! Routes decoded commands to the engine and produces the reply for each one.

use super::registration::PriorityRegistration;
use super::settings::ConnectionSettings;
use crate::core::color::Image;
use crate::core::engine::{Component, ConnectionId, Engine};
use crate::core::metrics;
use crate::core::{IncomingCommand, OutgoingReply, ProtoServerError};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Executes one command at a time against the engine on behalf of a single
/// connection.
pub struct CommandDispatcher {
    engine: Arc<dyn Engine>,
    registration: PriorityRegistration,
    origin: String,
}

impl CommandDispatcher {
    pub fn new(engine: Arc<dyn Engine>, owner: ConnectionId, settings: &ConnectionSettings) -> Self {
        Self {
            engine,
            registration: PriorityRegistration::new(owner, settings.smoothing_cfg),
            origin: settings.origin.clone(),
        }
    }

    /// Runs `command` and returns the reply for the client. Command-level
    /// failures become error replies; nothing here ends the connection.
    pub fn dispatch(&mut self, command: IncomingCommand) -> OutgoingReply {
        let name = command.name();
        metrics::COMMANDS_PROCESSED_TOTAL
            .with_label_values(&[name])
            .inc();

        match self.execute(command) {
            Ok(()) => OutgoingReply::Success,
            Err(e) => {
                debug!("Command '{}' failed: {}", name, e);
                metrics::PROTOCOL_ERRORS_TOTAL
                    .with_label_values(&[e.kind()])
                    .inc();
                OutgoingReply::from(&e)
            }
        }
    }

    /// Handles an engine-initiated release of `priority`.
    pub fn revoke(&mut self, priority: i32) -> bool {
        self.registration.revoke(priority)
    }

    pub fn registered_priority(&self) -> Option<i32> {
        self.registration.current()
    }

    fn execute(&mut self, command: IncomingCommand) -> Result<(), ProtoServerError> {
        match command {
            IncomingCommand::SetColor {
                priority,
                rgb,
                duration_ms,
            } => {
                self.registration.maybe_register(
                    self.engine.as_ref(),
                    priority,
                    Component::Color,
                    &self.origin,
                );
                self.engine
                    .set_color(priority, rgb, duration_ms, &self.origin, true);
                Ok(())
            }
            IncomingCommand::SetImage {
                priority,
                width,
                height,
                pixel_data,
                duration_ms,
                clear_effect,
            } => {
                self.registration.maybe_register(
                    self.engine.as_ref(),
                    priority,
                    Component::Image,
                    &self.origin,
                );
                let image = build_image(width, height, pixel_data)?;
                self.engine
                    .set_image(priority, image, duration_ms, clear_effect)?;
                Ok(())
            }
            IncomingCommand::Clear { priority } => {
                self.engine.clear_priority(priority);
                Ok(())
            }
            IncomingCommand::ClearAll { force } => {
                self.engine.clear_all_priorities(force);
                Ok(())
            }
            IncomingCommand::Unrecognized(tag) => {
                debug!("Unrecognized command tag {}.", tag);
                Err(ProtoServerError::UnsupportedCommand)
            }
        }
    }
}

/// Checks the pixel buffer against the declared dimensions. Negative
/// dimensions never match.
fn build_image(width: i32, height: i32, pixel_data: Bytes) -> Result<Image, ProtoServerError> {
    let actual = pixel_data.len();
    let expected = (width.max(0) as usize)
        .saturating_mul(height.max(0) as usize)
        .saturating_mul(Image::BYTES_PER_PIXEL);

    let (Ok(w), Ok(h)) = (usize::try_from(width), usize::try_from(height)) else {
        return Err(ProtoServerError::ImageSizeMismatch { expected, actual });
    };
    Image::from_rgb(w, h, pixel_data)
        .ok_or(ProtoServerError::ImageSizeMismatch { expected, actual })
}
