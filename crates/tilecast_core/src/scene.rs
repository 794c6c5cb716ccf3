//! # Scene Configuration
//!
//! A [`SceneConfig`] is everything a render request says about the image:
//! its size, which sky and scene preset to use and the two hues that tint
//! them. Together with the engine's quality settings it fully determines
//! the output pixels.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::color::Rgb8;
use crate::error::{SceneError, SceneResult};
use crate::MAX_DIMENSION;

/// Background presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SkyVariant {
    /// White at the horizon fading to light blue overhead.
    #[default]
    Day = 0,
    /// Warm orange horizon under a violet sky.
    Dusk = 1,
    /// Blend from the first hue to the second.
    Hues = 2,
    /// Near-black sky with a faint glow of the first hue at the horizon.
    Night = 3,
}

impl SkyVariant {
    /// Every variant, in index order.
    pub const ALL: [Self; 4] = [Self::Day, Self::Dusk, Self::Hues, Self::Night];

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Dusk => "dusk",
            Self::Hues => "hues",
            Self::Night => "night",
        }
    }
}

impl TryFrom<u8> for SkyVariant {
    type Error = SceneError;

    fn try_from(index: u8) -> SceneResult<Self> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(SceneError::UnknownSky(index))
    }
}

/// Scene-content presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SceneVariant {
    /// A mirror ball ringed by eight small spheres.
    #[default]
    Ring = 0,
    /// Two receding rows of small spheres either side of a mirror ball.
    Pillars = 1,
    /// One large sphere alone on the ground.
    Lone = 2,
}

impl SceneVariant {
    /// Every variant, in index order.
    pub const ALL: [Self; 3] = [Self::Ring, Self::Pillars, Self::Lone];

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ring => "ring",
            Self::Pillars => "pillars",
            Self::Lone => "lone",
        }
    }
}

impl TryFrom<u8> for SceneVariant {
    type Error = SceneError;

    fn try_from(index: u8) -> SceneResult<Self> {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .ok_or(SceneError::UnknownScene(index))
    }
}

/// A render request's description of the image.
///
/// Plain data; call [`SceneConfig::validate`] before using one from an
/// untrusted source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneConfig {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Background preset.
    pub sky: SkyVariant,
    /// Scene-content preset.
    pub scene: SceneVariant,
    /// First hue (small spheres, sky blend start).
    pub hue1: Rgb8,
    /// Second hue (feature sphere, sky blend end).
    pub hue2: Rgb8,
}

impl SceneConfig {
    /// Creates and validates a config.
    pub fn new(
        width: u32,
        height: u32,
        sky: SkyVariant,
        scene: SceneVariant,
        hue1: Rgb8,
        hue2: Rgb8,
    ) -> SceneResult<Self> {
        let config = Self { width, height, sky, scene, hue1, hue2 };
        config.validate()?;
        Ok(config)
    }

    /// Creates a config from untyped host inputs (preset indices and
    /// integer color components).
    pub fn from_raw(
        width: u32,
        height: u32,
        sky_index: u8,
        scene_index: u8,
        hue1: [i64; 3],
        hue2: [i64; 3],
    ) -> SceneResult<Self> {
        Self::new(
            width,
            height,
            SkyVariant::try_from(sky_index)?,
            SceneVariant::try_from(scene_index)?,
            Rgb8::from_components(hue1[0], hue1[1], hue1[2])?,
            Rgb8::from_components(hue2[0], hue2[1], hue2[2])?,
        )
    }

    /// Checks the dimension bounds.
    ///
    /// Variants and hues are range-checked by their types.
    pub fn validate(&self) -> SceneResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SceneError::EmptyImage { width: self.width, height: self.height });
        }
        for value in [self.width, self.height] {
            if value > MAX_DIMENSION {
                return Err(SceneError::DimensionTooLarge { value, max: MAX_DIMENSION });
            }
        }
        Ok(())
    }

    /// Number of pixels in the image.
    #[inline]
    #[must_use]
    pub const fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Size of the full image in packed RGB bytes.
    #[inline]
    #[must_use]
    pub const fn byte_len(&self) -> u64 {
        self.pixel_count() * Rgb8::SIZE as u64
    }

    /// Width over height.
    #[inline]
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Stable 64-bit digest of every field, used to seed sampling.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(0x7469_6c65_6361_7374, 0x7363_656e_6563_6667);
        hasher.write_u32(self.width);
        hasher.write_u32(self.height);
        hasher.write_u8(self.sky as u8);
        hasher.write_u8(self.scene as u8);
        hasher.write(&self.hue1.to_array());
        hasher.write(&self.hue2.to_array());
        hasher.finish()
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            sky: SkyVariant::Day,
            scene: SceneVariant::Ring,
            hue1: Rgb8::new(128, 204, 128),
            hue2: Rgb8::new(128, 128, 128),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_indices() {
        for (i, sky) in SkyVariant::ALL.iter().enumerate() {
            assert_eq!(SkyVariant::try_from(i as u8), Ok(*sky));
            assert_eq!(*sky as u8, i as u8);
        }
        for (i, scene) in SceneVariant::ALL.iter().enumerate() {
            assert_eq!(SceneVariant::try_from(i as u8), Ok(*scene));
        }
        assert_eq!(SkyVariant::try_from(4), Err(SceneError::UnknownSky(4)));
        assert_eq!(SceneVariant::try_from(3), Err(SceneError::UnknownScene(3)));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = SceneConfig::from_raw(0, 100, 0, 0, [0; 3], [0; 3]).unwrap_err();
        assert_eq!(err, SceneError::EmptyImage { width: 0, height: 100 });
        assert!(SceneConfig::from_raw(100, 0, 0, 0, [0; 3], [0; 3]).is_err());
    }

    #[test]
    fn test_oversized_rejected() {
        let err = SceneConfig::from_raw(MAX_DIMENSION + 1, 1, 0, 0, [0; 3], [0; 3]).unwrap_err();
        assert!(matches!(err, SceneError::DimensionTooLarge { .. }));
        assert!(SceneConfig::from_raw(MAX_DIMENSION, 1, 0, 0, [0; 3], [0; 3]).is_ok());
    }

    #[test]
    fn test_from_raw_checks_every_field() {
        assert_eq!(
            SceneConfig::from_raw(8, 8, 9, 0, [0; 3], [0; 3]),
            Err(SceneError::UnknownSky(9))
        );
        assert_eq!(
            SceneConfig::from_raw(8, 8, 0, 0, [0, 300, 0], [0; 3]),
            Err(SceneError::ComponentOutOfRange(300))
        );
        let ok = SceneConfig::from_raw(128, 128, 2, 0, [255, 0, 0], [0, 0, 255]).unwrap();
        assert_eq!(ok.sky, SkyVariant::Hues);
        assert_eq!(ok.byte_len(), 49_152);
    }

    #[test]
    fn test_fingerprint_sensitivity() {
        let a = SceneConfig::default();
        let mut b = a;
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.hue2 = Rgb8::new(128, 128, 129);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
