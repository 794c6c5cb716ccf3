//! # Protocol Error Types

use thiserror::Error;
use tilecast_core::SceneError;

/// Errors raised while building or decoding protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The frame had no bytes at all.
    #[error("empty frame")]
    Empty,

    /// The first byte named no known message.
    #[error("unknown message type: {0:#04x}")]
    UnknownType(u8),

    /// The frame ended before a field was complete.
    #[error("truncated frame: needed {needed} more bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the next field needs.
        needed: usize,
        /// Bytes left in the frame.
        remaining: usize,
    },

    /// Bytes were left over after the message was complete.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// A pixel buffer did not hold exactly `width * height * 3` bytes.
    #[error("pixel buffer for {width}x{height} tile must be {expected} bytes, got {actual}")]
    PixelLength {
        /// Tile width.
        width: u32,
        /// Tile height.
        height: u32,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// A tile had a zero or oversized dimension.
    #[error("invalid tile size {width}x{height}")]
    TileSize {
        /// Tile width.
        width: u32,
        /// Tile height.
        height: u32,
    },

    /// A failure reason was not valid UTF-8.
    #[error("reason text is not valid UTF-8")]
    InvalidUtf8,

    /// A render request carried an unusable scene.
    #[error("invalid scene: {0}")]
    InvalidScene(#[from] SceneError),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
