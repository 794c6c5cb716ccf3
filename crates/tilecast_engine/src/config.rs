//! # Engine Configuration
//!
//! Loaded once at startup, usually from a small TOML file:
//!
//! ```toml
//! tile_size = 64
//! worker_threads = 0        # 0 = one per available core
//! samples_per_pixel = 10
//! max_bounces = 50
//! channel_capacity = 256
//! ```
//!
//! Every field is optional; missing fields take the [`Default`] value.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tilecast_core::{Quality, MAX_DIMENSION};

/// Errors raised while loading or checking an [`EngineConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {message}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        message: String,
    },

    /// The text was not valid TOML for this struct.
    #[error("malformed engine config: {0}")]
    Parse(String),

    /// A field held an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Tuning knobs for the engine. None of them change what a pixel means,
/// only how much work goes into it and how it is scheduled.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Edge length of a full tile in pixels.
    pub tile_size: u32,
    /// Tile workers to start; 0 picks one per available core.
    pub worker_threads: usize,
    /// Jittered rays averaged per pixel.
    pub samples_per_pixel: u32,
    /// Surface interactions followed before a path is cut off.
    pub max_bounces: u32,
    /// Capacity of each direction of the render channel.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_size: 64,
            worker_threads: 0,
            samples_per_pixel: Quality::FINAL.samples_per_pixel,
            max_bounces: Quality::FINAL.max_bounces,
            channel_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Cheap settings for interactive previews and tests.
    #[must_use]
    pub const fn preview() -> Self {
        Self {
            tile_size: 32,
            worker_threads: 0,
            samples_per_pixel: Quality::PREVIEW.samples_per_pixel,
            max_bounces: Quality::PREVIEW.max_bounces,
            channel_capacity: 256,
        }
    }

    /// Final-quality settings.
    ///
    /// Larger tiles amortize per-tile overhead once each pixel costs
    /// dozens of rays.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            tile_size: 64,
            worker_threads: 0,
            samples_per_pixel: 32,
            max_bounces: 50,
            channel_capacity: 1024,
        }
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Checks every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 || self.tile_size > MAX_DIMENSION {
            return Err(ConfigError::Invalid {
                field: "tile_size",
                reason: "must be between 1 and 16384",
            });
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::Invalid { field: "samples_per_pixel", reason: "must be positive" });
        }
        if self.max_bounces == 0 {
            return Err(ConfigError::Invalid { field: "max_bounces", reason: "must be positive" });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid { field: "channel_capacity", reason: "must be positive" });
        }
        Ok(())
    }

    /// Sampling budget handed to the shader.
    #[inline]
    #[must_use]
    pub const fn quality(&self) -> Quality {
        Quality { samples_per_pixel: self.samples_per_pixel, max_bounces: self.max_bounces }
    }

    /// Number of tile workers to start.
    #[must_use]
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}
