// src/core/color.rs

//! Color and image primitives exchanged with the engine.

use bytes::Bytes;
use std::fmt;

/// A single 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorRgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ColorRgb {
    pub const BLACK: ColorRgb = ColorRgb::new(0, 0, 0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Unpacks a color from the `0x00RRGGBB` layout used on the wire.
    /// The top byte is ignored.
    pub fn from_packed(packed: i32) -> Self {
        let packed = packed as u32;
        Self {
            red: ((packed >> 16) & 0xFF) as u8,
            green: ((packed >> 8) & 0xFF) as u8,
            blue: (packed & 0xFF) as u8,
        }
    }

    /// Packs the color into the `0x00RRGGBB` wire layout.
    pub fn to_packed(self) -> i32 {
        ((self.red as i32) << 16) | ((self.green as i32) << 8) | self.blue as i32
    }
}

impl fmt::Display for ColorRgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_packed())
    }
}

/// An RGB image with tightly packed rows, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    data: Bytes,
}

impl Image {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Builds an image from raw RGB bytes. Returns `None` when the buffer length
    /// does not equal `width * height * 3`.
    pub fn from_rgb(width: usize, height: usize, data: Bytes) -> Option<Self> {
        let expected = width
            .checked_mul(height)?
            .checked_mul(Self::BYTES_PER_PIXEL)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}
