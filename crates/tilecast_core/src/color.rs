//! # Pixel Colors
//!
//! `Rgb8` is the wire and display pixel: three bytes, no padding, no alpha.
//! It is `Pod`, so a packed `&[u8]` of length `3 * n` can be viewed as
//! `&[Rgb8]` without copying.

use bytemuck::{Pod, Zeroable};

use crate::error::{SceneError, SceneResult};
use crate::math::Color;

/// An 8-bit-per-channel RGB triple.
///
/// Size: 3 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgb8 {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
}

impl Rgb8 {
    /// Size in bytes.
    pub const SIZE: usize = 3;

    /// Black.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// White.
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Color written in place of a sample whose radiance was not finite.
    pub const FALLBACK: Self = Self::new(255, 0, 255);

    /// Creates a new triple.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a triple from untyped host integers, rejecting anything
    /// outside `0..=255`.
    pub fn from_components(r: i64, g: i64, b: i64) -> SceneResult<Self> {
        let channel =
            |v: i64| u8::try_from(v).map_err(|_| SceneError::ComponentOutOfRange(v));
        Ok(Self::new(channel(r)?, channel(g)?, channel(b)?))
    }

    /// Parses `#rrggbb` or `rrggbb` (case-insensitive), the format produced by
    /// HTML color inputs.
    pub fn from_hex(text: &str) -> SceneResult<Self> {
        let digits = text.trim().strip_prefix('#').unwrap_or(text.trim());
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SceneError::MalformedHex(text.to_string()));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| SceneError::MalformedHex(text.to_string()))
        };
        Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
    }

    /// Formats as lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Converts to an array.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Creates from an array.
    #[inline]
    #[must_use]
    pub const fn from_array(arr: [u8; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }

    /// Linear color with each channel in `0.0..=1.0`.
    #[inline]
    #[must_use]
    pub fn to_linear(self) -> Color {
        Color::new(
            f64::from(self.r) / 255.0,
            f64::from(self.g) / 255.0,
            f64::from(self.b) / 255.0,
        )
    }

    /// Quantizes a radiance value.
    ///
    /// Channels at or below 0 map to 0, at or above 1 to 255, and
    /// everything in between to `floor(256 * c)`.
    #[inline]
    #[must_use]
    pub fn quantize(color: Color) -> Self {
        Self::new(quantize_channel(color.x), quantize_channel(color.y), quantize_channel(color.z))
    }
}

#[inline]
fn quantize_channel(c: f64) -> u8 {
    if c <= 0.0 {
        0
    } else if c >= 1.0 {
        255
    } else {
        (256.0 * c) as u8
    }
}

impl From<[u8; 3]> for Rgb8 {
    fn from(arr: [u8; 3]) -> Self {
        Self::from_array(arr)
    }
}
