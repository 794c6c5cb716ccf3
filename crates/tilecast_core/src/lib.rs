//! # TILECAST Core
//!
//! The scene model and optics behind the tile-streaming tracer.
//!
//! ## Contents
//!
//! - [`math`]: vectors and rays
//! - [`color`]: the packed 3-byte pixel and color quantization
//! - [`scene`]: render-request configuration (size, presets, hues)
//! - [`optics`]: mirror spheres under a procedural sky
//! - [`shade`]: jittered, deterministic per-pixel shading
//!
//! Nothing here spawns threads or owns channels; the engine crate drives it.
//!
//! ## Example
//!
//! ```rust
//! use tilecast_core::{PixelShader, Quality, SceneConfig};
//!
//! let config = SceneConfig::from_raw(64, 48, 2, 0, [255, 0, 0], [0, 0, 255]).unwrap();
//! let shader = PixelShader::new(&config, Quality::PREVIEW);
//! let pixel = shader.shade(10, 20);
//! assert!(!pixel.substituted);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod color;
pub mod error;
pub mod math;
pub mod optics;
pub mod scene;
pub mod shade;

pub use color::Rgb8;
pub use error::{SceneError, SceneResult};
pub use math::{Color, Ray, Vec3};
pub use optics::{Hit, Mirror, Sky, Sphere, World};
pub use scene::{SceneConfig, SceneVariant, SkyVariant};
pub use shade::{PixelShader, Quality, Shaded};

/// Largest accepted image width or height.
///
/// Keeps `width * height * 3` comfortably inside `u32` per tile and `u64`
/// per image.
pub const MAX_DIMENSION: u32 = 16_384;
