//! # Tiles
//!
//! A tile is a rectangle of the image plus its packed pixels.
//!
//! ## Pixel Layout
//!
//! ```text
//! ┌────────── width * 3 bytes ──────────┐
//! │ R G B │ R G B │ ... │ R G B │  row 0
//! │ R G B │ R G B │ ... │ R G B │  row 1
//! │                 ...                 │
//! └─────────────────────────────────────┘  row height-1
//! ```
//!
//! Row-major, three bytes per pixel, no padding, no header: exactly
//! `width * height * 3` bytes.

use std::fmt;

use tilecast_core::{Rgb8, MAX_DIMENSION};

use crate::error::{ProtocolError, ProtocolResult};

/// Identifier of one render request, assigned by the host endpoint.
///
/// Every engine message about a request carries it, so a host can drop
/// output belonging to a request it has since replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The id that follows this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A rectangle of image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileRect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl TileRect {
    /// Creates a new rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Size of this rectangle's packed pixels in bytes.
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * Rgb8::SIZE
    }

    /// One past the rightmost column.
    #[inline]
    #[must_use]
    pub const fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// One past the bottom row.
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// True if the pixel `(px, py)` lies inside.
    #[inline]
    #[must_use]
    pub const fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && (px as u64) < self.right() && py >= self.y && (py as u64) < self.bottom()
    }

    /// True if the two rectangles share at least one pixel.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        (self.x as u64) < other.right()
            && (other.x as u64) < self.right()
            && (self.y as u64) < other.bottom()
            && (other.y as u64) < self.bottom()
    }

    /// Checks both dimensions are in `1..=MAX_DIMENSION`.
    pub fn validate(&self) -> ProtocolResult<()> {
        let ok = |v: u32| (1..=MAX_DIMENSION).contains(&v);
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(ProtocolError::TileSize { width: self.width, height: self.height })
        }
    }
}

/// Packed RGB pixels of one tile.
///
/// Owns its bytes; moving a `PixelBuffer` through a channel hands the
/// allocation to the receiver without copying it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl PixelBuffer {
    /// Creates an empty buffer with room for `width * height` pixels.
    ///
    /// Fill it with [`PixelBuffer::push`] in row-major order.
    #[must_use]
    pub fn with_capacity(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * Rgb8::SIZE;
        Self { width, height, bytes: Vec::with_capacity(len) }
    }

    /// Wraps existing packed bytes, checking the length.
    pub fn from_bytes(width: u32, height: u32, bytes: Vec<u8>) -> ProtocolResult<Self> {
        let expected = width as usize * height as usize * Rgb8::SIZE;
        if bytes.len() != expected {
            return Err(ProtocolError::PixelLength {
                width,
                height,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self { width, height, bytes })
    }

    /// Appends the next pixel in row-major order.
    #[inline]
    pub fn push(&mut self, pixel: Rgb8) {
        self.bytes.extend_from_slice(&pixel.to_array());
    }

    /// True once every pixel has been pushed.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.bytes.len() == self.width as usize * self.height as usize * Rgb8::SIZE
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// The packed bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The pixels, viewed in place.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[Rgb8] {
        bytemuck::cast_slice(self.bytes.as_slice())
    }

    /// Pixel at `(x, y)` relative to the tile origin.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels().get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Iterates over rows of packed bytes, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.bytes.chunks_exact((self.width as usize * Rgb8::SIZE).max(1))
    }

    /// Releases the bytes.
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// One finished tile of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileResult {
    /// Request the tile belongs to.
    pub session: SessionId,
    /// Where the tile sits in the image.
    pub rect: TileRect,
    /// Packed pixels.
    pub pixels: PixelBuffer,
    /// Pixels replaced by [`Rgb8::FALLBACK`] because their radiance was not
    /// finite.
    pub substituted: u32,
}

impl TileResult {
    /// Assembles a tile, checking the buffer matches the rectangle.
    pub fn new(
        session: SessionId,
        rect: TileRect,
        pixels: PixelBuffer,
        substituted: u32,
    ) -> ProtocolResult<Self> {
        rect.validate()?;
        if pixels.width() != rect.width
            || pixels.height() != rect.height
            || pixels.as_bytes().len() != rect.byte_len()
        {
            return Err(ProtocolError::PixelLength {
                width: rect.width,
                height: rect.height,
                expected: rect.byte_len(),
                actual: pixels.as_bytes().len(),
            });
        }
        Ok(Self { session, rect, pixels, substituted })
    }
}
