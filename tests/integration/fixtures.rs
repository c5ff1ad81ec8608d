// tests/integration/fixtures.rs

//! Common test fixtures: request builders and raw frame helpers.

#![allow(dead_code)]

use bytes::Bytes;
use prost::Message as ProstMessage;
use protoserver::core::protocol::frame::encode_frame;
use protoserver::core::protocol::message::{
    ClearRequest, ClearallRequest, ColorRequest, HyperionRequest, ImageRequest, hyperion_request,
};

/// Packed `0x00RRGGBB` red.
pub const RED: i32 = 0x00FF_0000;
pub const GREEN: i32 = 0x0000_FF00;

pub fn color_request(priority: i32, rgb_color: i32, duration: Option<i32>) -> HyperionRequest {
    HyperionRequest {
        command: Some(hyperion_request::Command::Color as i32),
        color_request: Some(ColorRequest {
            priority,
            rgb_color,
            duration,
        }),
        ..Default::default()
    }
}

pub fn image_request(
    priority: i32,
    width: i32,
    height: i32,
    data: &[u8],
    duration: Option<i32>,
) -> HyperionRequest {
    HyperionRequest {
        command: Some(hyperion_request::Command::Image as i32),
        image_request: Some(ImageRequest {
            priority,
            imagewidth: width,
            imageheight: height,
            imagedata: Bytes::copy_from_slice(data),
            duration,
            clear_effect: None,
        }),
        ..Default::default()
    }
}

pub fn clear_request(priority: i32) -> HyperionRequest {
    HyperionRequest {
        command: Some(hyperion_request::Command::Clear as i32),
        clear_request: Some(ClearRequest { priority }),
        ..Default::default()
    }
}

pub fn clearall_request(force: Option<bool>) -> HyperionRequest {
    HyperionRequest {
        command: Some(hyperion_request::Command::Clearall as i32),
        clearall_request: force.map(|force| ClearallRequest { force: Some(force) }),
        ..Default::default()
    }
}

/// A structurally valid request with a command tag no server knows.
pub fn unknown_request(tag: i32) -> HyperionRequest {
    HyperionRequest {
        command: Some(tag),
        ..Default::default()
    }
}

/// The complete wire frame for `request`.
pub fn frame_for(request: &HyperionRequest) -> Bytes {
    encode_frame(&request.encode_to_vec()).unwrap()
}

/// A 2x1 image: one red pixel, one blue pixel.
pub fn two_pixel_image() -> Vec<u8> {
    vec![255, 0, 0, 0, 0, 255]
}
