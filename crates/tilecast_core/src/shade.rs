//! # Pixel Shading
//!
//! Turns an image coordinate into a quantized color.
//!
//! Each pixel averages `samples_per_pixel` jittered camera rays. The jitter
//! stream is a ChaCha8 generator seeded from the pixel coordinate and the
//! scene fingerprint, so a pixel's value never depends on which tile it
//! landed in, in what order tiles ran, or on how many threads ran them.

use std::hash::Hasher;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use siphasher::sip::SipHasher13;

use crate::color::Rgb8;
use crate::math::{Color, Ray, Vec3};
use crate::optics::World;
use crate::scene::SceneConfig;

/// Distance from the pinhole to the image plane.
const FOCAL_LENGTH: f64 = 1.0;

/// Height of the image plane in world units.
const VIEWPORT_HEIGHT: f64 = 2.0;

/// Sampling budget per pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Quality {
    /// Jittered rays averaged per pixel.
    pub samples_per_pixel: u32,
    /// Surface interactions followed before a path is cut off.
    pub max_bounces: u32,
}

impl Quality {
    /// One ray per pixel, short paths. For previews and tests.
    pub const PREVIEW: Self = Self { samples_per_pixel: 1, max_bounces: 8 };

    /// Ten rays per pixel, long paths.
    pub const FINAL: Self = Self { samples_per_pixel: 10, max_bounces: 50 };
}

impl Default for Quality {
    fn default() -> Self {
        Self::FINAL
    }
}

/// Outcome of shading one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shaded {
    /// Quantized color.
    pub color: Rgb8,
    /// True if the radiance was not finite and [`Rgb8::FALLBACK`] was used.
    pub substituted: bool,
}

/// Per-request shading state: the resolved world plus camera constants.
///
/// Read-only after construction; share it between tile workers.
#[derive(Clone, Debug)]
pub struct PixelShader {
    world: World,
    quality: Quality,
    width: f64,
    height: f64,
    viewport_width: f64,
    seed: u64,
}

impl PixelShader {
    /// Prepares shading for a request.
    #[must_use]
    pub fn new(config: &SceneConfig, quality: Quality) -> Self {
        Self {
            world: World::from_config(config),
            quality,
            width: f64::from(config.width),
            height: f64::from(config.height),
            viewport_width: config.aspect_ratio() * VIEWPORT_HEIGHT,
            seed: config.fingerprint(),
        }
    }

    /// The resolved world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The sampling budget.
    #[must_use]
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Shades the pixel at column `x`, row `y`.
    #[must_use]
    pub fn shade(&self, x: u32, y: u32) -> Shaded {
        let mut rng = ChaCha8Rng::seed_from_u64(self.pixel_seed(x, y));
        let samples = self.quality.samples_per_pixel.max(1);

        let mut total = Color::ZERO;
        for _ in 0..samples {
            let jitter_x: f64 = rng.gen();
            let jitter_y: f64 = rng.gen();
            let ray = self.camera_ray(x, y, jitter_x, jitter_y);
            total += self.world.trace(ray, self.quality.max_bounces);
        }
        total /= f64::from(samples);

        Self::finish(total)
    }

    /// Quantizes an averaged radiance, substituting the fallback color for
    /// non-finite values.
    #[must_use]
    pub fn finish(radiance: Color) -> Shaded {
        if radiance.is_finite() {
            Shaded { color: Rgb8::quantize(radiance), substituted: false }
        } else {
            Shaded { color: Rgb8::FALLBACK, substituted: true }
        }
    }

    /// Camera ray through a point inside pixel `(x, y)`; the jitter values
    /// are offsets within the pixel in `0.0..1.0`.
    #[must_use]
    pub fn camera_ray(&self, x: u32, y: u32, jitter_x: f64, jitter_y: f64) -> Ray {
        let direction = Vec3::new(
            (f64::from(x) - self.width / 2.0 + jitter_x) * self.viewport_width / self.width,
            (f64::from(y) - self.height / 2.0 + jitter_y) * VIEWPORT_HEIGHT / self.height,
            FOCAL_LENGTH,
        );
        Ray::new(Vec3::ZERO, direction)
    }

    fn pixel_seed(&self, x: u32, y: u32) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(self.seed, 0x7069_7865_6c73_6565);
        hasher.write_u32(x);
        hasher.write_u32(y);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneVariant, SkyVariant};

    fn config() -> SceneConfig {
        SceneConfig {
            width: 32,
            height: 24,
            sky: SkyVariant::Hues,
            scene: SceneVariant::Ring,
            hue1: Rgb8::new(255, 0, 0),
            hue2: Rgb8::new(0, 0, 255),
        }
    }

    #[test]
    fn test_shading_is_deterministic() {
        let a = PixelShader::new(&config(), Quality::PREVIEW);
        let b = PixelShader::new(&config(), Quality::PREVIEW);
        for y in 0..24 {
            for x in 0..32 {
                assert_eq!(a.shade(x, y), b.shade(x, y), "Mismatch at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_hues_change_pixels() {
        let a = PixelShader::new(&config(), Quality::PREVIEW);
        let mut other = config();
        other.hue1 = Rgb8::new(0, 255, 0);
        let b = PixelShader::new(&other, Quality::PREVIEW);
        let differs = (0..24).any(|y| (0..32).any(|x| a.shade(x, y) != b.shade(x, y)));
        assert!(differs);
    }

    #[test]
    fn test_non_finite_radiance_is_substituted() {
        let shaded = PixelShader::finish(Color::new(f64::NAN, 0.0, 0.0));
        assert_eq!(shaded, Shaded { color: Rgb8::FALLBACK, substituted: true });
        let shaded = PixelShader::finish(Color::new(0.5, 0.0, f64::INFINITY));
        assert!(shaded.substituted);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let shader = PixelShader::new(&config(), Quality::PREVIEW);
        let ray = shader.camera_ray(16, 12, 0.0, 0.0);
        assert_eq!(ray.direction, Vec3::new(0.0, 0.0, FOCAL_LENGTH));
    }

    #[test]
    fn test_shader_keeps_request_state() {
        let shader = PixelShader::new(&config(), Quality::PREVIEW);
        assert_eq!(shader.quality(), Quality::PREVIEW);
        assert_eq!(shader.world().object_count(), World::from_config(&config()).object_count());
        // One sample along the jittered centre ray, traced through the shared world.
        let mut rng = ChaCha8Rng::seed_from_u64(shader.pixel_seed(16, 12));
        let (jx, jy): (f64, f64) = (rng.gen(), rng.gen());
        let radiance = shader.world().trace(shader.camera_ray(16, 12, jx, jy), 8);
        assert_eq!(shader.shade(16, 12), PixelShader::finish(radiance));
    }

    #[test]
    fn test_one_by_one_image_shades() {
        let tiny = SceneConfig { width: 1, height: 1, ..config() };
        let shader = PixelShader::new(&tiny, Quality::FINAL);
        assert!(!shader.shade(0, 0).substituted);
    }
}
