//! # Scene Error Types
//!
//! Everything that makes a render request unusable.

use thiserror::Error;

/// Reasons a scene configuration is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Width or height was zero.
    #[error("image dimensions must be positive, got {width}x{height}")]
    EmptyImage {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Width or height exceeded [`crate::MAX_DIMENSION`].
    #[error("image dimension {value} exceeds the maximum of {max}")]
    DimensionTooLarge {
        /// Offending dimension.
        value: u32,
        /// Allowed maximum.
        max: u32,
    },

    /// Sky index outside the preset table.
    #[error("unknown sky variant: {0}")]
    UnknownSky(u8),

    /// Scene index outside the preset table.
    #[error("unknown scene variant: {0}")]
    UnknownScene(u8),

    /// A color component did not fit in a byte.
    #[error("color component out of range: {0}")]
    ComponentOutOfRange(i64),

    /// A hue string was not `#rrggbb`.
    #[error("malformed hex color: {0:?}")]
    MalformedHex(String),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
