//! # Canvas
//!
//! The host's drawing surface. Tiles arrive in any order; each is expanded
//! from packed RGB to opaque RGBA and pasted at its origin.
//!
//! ```text
//!   tile (RGB, w*h*3)            canvas (RGBA, W*H*4)
//!   ┌─────┐                      ┌───────────────────┐
//!   │ RGB │ ──expand, a=255──>   │      ┌─────┐      │
//!   └─────┘                      │      │RGBA │      │
//!                                │      └─────┘      │
//!                                └───────────────────┘
//! ```

use std::io::{self, Write};

use tilecast_core::Rgb8;
use tilecast_protocol::{TileRect, TileResult};

use crate::error::{HostError, HostResult};

/// PPM flavours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PpmFormat {
    /// `P3`: one `r g b` line per pixel.
    #[default]
    Text,
    /// `P6`: packed bytes after the header.
    Binary,
}

/// An RGBA surface that remembers which pixels have been painted.
#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    painted: Vec<bool>,
    painted_count: u64,
}

impl Canvas {
    /// Bytes per canvas pixel.
    pub const CHANNELS: usize = 4;

    /// Creates a transparent-black canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            rgba: vec![0; pixels * Self::CHANNELS],
            painted: vec![false; pixels],
            painted_count: 0,
        }
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

    /// Pastes a tile at its origin.
    ///
    /// Fails without touching the canvas if the tile does not fit.
    pub fn paint_tile(&mut self, tile: &TileResult) -> HostResult<()> {
        let rect = tile.rect;
        if rect.right() > u64::from(self.width) || rect.bottom() > u64::from(self.height) {
            return Err(HostError::TileOutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            });
        }

        let stride = self.width as usize;
        for (row, bytes) in tile.pixels.rows().enumerate() {
            let first = (rect.y as usize + row) * stride + rect.x as usize;
            let dst = &mut self.rgba[first * Self::CHANNELS..(first + rect.width as usize) * Self::CHANNELS];
            for (out, rgb) in dst.chunks_exact_mut(Self::CHANNELS).zip(bytes.chunks_exact(Rgb8::SIZE)) {
                out[..3].copy_from_slice(rgb);
                out[3] = u8::MAX;
            }
            for flag in &mut self.painted[first..first + rect.width as usize] {
                if !*flag {
                    *flag = true;
                    self.painted_count += 1;
                }
            }
        }
        Ok(())
    }

    /// RGBA of the pixel at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.rgba[i..i + Self::CHANNELS]);
        Some(out)
    }

    /// True if the pixel at `(x, y)` has been painted.
    #[must_use]
    pub fn is_painted(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.painted[y as usize * self.width as usize + x as usize]
    }

    /// True if every pixel inside `rect` has been painted.
    #[must_use]
    pub fn covers(&self, rect: &TileRect) -> bool {
        (rect.y..rect.y.saturating_add(rect.height))
            .all(|y| (rect.x..rect.x.saturating_add(rect.width)).all(|x| self.is_painted(x, y)))
    }

    /// Number of distinct pixels painted so far.
    #[inline]
    #[must_use]
    pub const fn painted_pixels(&self) -> u64 {
        self.painted_count
    }

    /// True once every pixel has been painted.
    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.painted_count == self.width as u64 * self.height as u64
    }

    /// The surface, row-major RGBA.
    #[inline]
    #[must_use]
    pub fn as_rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// The surface as packed RGB, alpha dropped.
    #[must_use]
    pub fn to_rgb(&self) -> Vec<u8> {
        self.rgba
            .chunks_exact(Self::CHANNELS)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }

    /// Writes the canvas as a PPM image.
    pub fn write_ppm<W: Write>(&self, mut out: W, format: PpmFormat) -> io::Result<()> {
        match format {
            PpmFormat::Text => {
                write!(out, "P3\n{} {}\n255\n", self.width, self.height)?;
                for px in self.rgba.chunks_exact(Self::CHANNELS) {
                    writeln!(out, "{} {} {}", px[0], px[1], px[2])?;
                }
            }
            PpmFormat::Binary => {
                write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
                out.write_all(&self.to_rgb())?;
            }
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecast_protocol::{PixelBuffer, SessionId};

    fn tile(x: u32, y: u32, w: u32, h: u32, fill: u8) -> TileResult {
        let bytes = vec![fill; (w * h * 3) as usize];
        let pixels = PixelBuffer::from_bytes(w, h, bytes).unwrap();
        TileResult::new(SessionId(1), TileRect::new(x, y, w, h), pixels, 0).unwrap()
    }

    #[test]
    fn test_paint_expands_to_opaque_rgba() {
        let mut canvas = Canvas::new(4, 4);
        let pixels = PixelBuffer::from_bytes(2, 1, vec![10, 20, 30, 40, 50, 60]).unwrap();
        let t = TileResult::new(SessionId(1), TileRect::new(1, 2, 2, 1), pixels, 0).unwrap();
        canvas.paint_tile(&t).unwrap();

        assert_eq!(canvas.pixel(1, 2), Some([10, 20, 30, 255]));
        assert_eq!(canvas.pixel(2, 2), Some([40, 50, 60, 255]));
        assert_eq!(canvas.pixel(0, 2), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(4, 0), None);
        assert_eq!(canvas.painted_pixels(), 2);
    }

    #[test]
    fn test_coverage_tracking() {
        let mut canvas = Canvas::new(4, 2);
        canvas.paint_tile(&tile(0, 0, 2, 2, 1)).unwrap();
        assert!(!canvas.is_complete());
        assert!(canvas.covers(&TileRect::new(0, 0, 2, 2)));
        assert!(!canvas.covers(&TileRect::new(1, 0, 2, 2)));

        canvas.paint_tile(&tile(2, 0, 2, 2, 2)).unwrap();
        assert!(canvas.is_complete());
        // Repainting does not count twice.
        canvas.paint_tile(&tile(0, 0, 2, 2, 3)).unwrap();
        assert_eq!(canvas.painted_pixels(), 8);
        assert_eq!(canvas.pixel(0, 0), Some([3, 3, 3, 255]));
    }

    #[test]
    fn test_out_of_bounds_tile_rejected() {
        let mut canvas = Canvas::new(4, 4);
        let err = canvas.paint_tile(&tile(3, 0, 2, 1, 9)).unwrap_err();
        assert!(matches!(err, HostError::TileOutOfBounds { .. }));
        assert_eq!(canvas.painted_pixels(), 0);
        assert!(canvas.as_rgba().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_ppm_text() {
        let mut canvas = Canvas::new(2, 1);
        let pixels = PixelBuffer::from_bytes(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap();
        canvas
            .paint_tile(&TileResult::new(SessionId(1), TileRect::new(0, 0, 2, 1), pixels, 0).unwrap())
            .unwrap();
        let mut out = Vec::new();
        canvas.write_ppm(&mut out, PpmFormat::Text).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "P3\n2 1\n255\n255 0 0\n0 0 255\n");
    }

    #[test]
    fn test_ppm_binary() {
        let mut canvas = Canvas::new(1, 2);
        canvas.paint_tile(&tile(0, 0, 1, 2, 7)).unwrap();
        let mut out = Vec::new();
        canvas.write_ppm(&mut out, PpmFormat::Binary).unwrap();
        let header = b"P6\n1 2\n255\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], &[7, 7, 7, 7, 7, 7]);
    }
}
