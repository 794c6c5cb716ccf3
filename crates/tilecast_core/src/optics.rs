//! # Optical Model
//!
//! Mirror spheres under a procedural sky.
//!
//! A ray that hits a sphere is reflected about the surface normal and the
//! radiance coming back along the reflected ray is filtered by the sphere's
//! albedo. A ray that escapes takes the sky color. Paths longer than the
//! bounce budget contribute black.
//!
//! ```text
//!   camera ──ray──> sphere ──reflect──> sphere ──reflect──> sky
//!                   ×albedo             ×albedo            radiance
//! ```

use crate::math::{Color, Ray, Vec3};
use crate::scene::{SceneConfig, SceneVariant, SkyVariant};

/// Hits closer than this are treated as the surface the ray just left.
const SELF_HIT_EPSILON: f64 = 1e-7;

/// Albedo of the ground sphere.
const GROUND_ALBEDO: Color = Color::new(0.9, 0.9, 0.9);

/// Day sky color looking level with the horizon.
const DAY_ZENITH: Color = Color::new(0.5, 0.7, 1.0);

/// A sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    /// Center point.
    pub center: Vec3,
    /// Radius.
    pub radius: f64,
}

impl Sphere {
    /// Creates a new sphere.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, radius: f64) -> Self {
        Self { center: Vec3::new(x, y, z), radius }
    }

    /// Ray parameter of the nearer intersection, if the ray meets the
    /// sphere at all. The value may be negative (behind the origin).
    #[inline]
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        let oc = ray.origin - self.center;
        let a = ray.direction.length_squared();
        let b = 2.0 * oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            None
        } else {
            Some((-b - discriminant.sqrt()) / (2.0 * a))
        }
    }

    /// Outward normal at a point on the surface (not normalized).
    #[inline]
    #[must_use]
    pub fn normal_at(&self, point: Vec3) -> Vec3 {
        point - self.center
    }
}

/// A perfect mirror that tints what it reflects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mirror {
    /// Per-channel reflectance.
    pub albedo: Color,
}

impl Mirror {
    /// Creates a mirror with the given reflectance.
    #[must_use]
    pub const fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

/// Result of a ray-scene intersection.
#[derive(Clone, Copy, Debug)]
pub struct Hit {
    /// Point of contact.
    pub point: Vec3,
    /// Surface normal at the point (not normalized).
    pub normal: Vec3,
    /// Material at the point.
    pub material: Mirror,
}

/// Background radiance as a function of direction.
///
/// The color is `nadir.lerp(zenith, horizon + up / 2)`, where `up` is the
/// upward component of the unit direction. With `horizon = 0.5` that spans
/// exactly nadir to zenith; the day sky sits at `1.0` and keeps getting
/// bluer overhead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sky {
    /// Color at blend weight zero.
    pub nadir: Color,
    /// Color at blend weight one.
    pub zenith: Color,
    /// Blend weight looking level with the horizon.
    pub horizon: f64,
}

impl Sky {
    /// Builds the sky for a preset.
    #[must_use]
    pub fn from_config(config: &SceneConfig) -> Self {
        let (nadir, zenith, horizon) = match config.sky {
            SkyVariant::Day => (Color::ONE, DAY_ZENITH, 1.0),
            SkyVariant::Dusk => (Color::new(1.0, 0.55, 0.25), Color::new(0.35, 0.2, 0.55), 0.5),
            SkyVariant::Hues => (config.hue1.to_linear(), config.hue2.to_linear(), 0.5),
            SkyVariant::Night => {
                (config.hue1.to_linear() * 0.3, Color::new(0.01, 0.01, 0.05), 0.5)
            }
        };
        Self { nadir, zenith, horizon }
    }

    /// Radiance arriving from `direction`.
    #[inline]
    #[must_use]
    pub fn radiance(&self, direction: Vec3) -> Color {
        let up = -direction.normalized().y;
        self.nadir.lerp(self.zenith, self.horizon + 0.5 * up)
    }
}

/// A fully resolved scene: geometry, materials and sky.
///
/// Built once per render request and shared read-only by every tile.
#[derive(Clone, Debug)]
pub struct World {
    objects: Vec<(Sphere, Mirror)>,
    sky: Sky,
}

impl World {
    /// Resolves the presets and hues of a config into geometry.
    #[must_use]
    pub fn from_config(config: &SceneConfig) -> Self {
        let small = Mirror::new(config.hue1.to_linear());
        let feature = Mirror::new(config.hue2.to_linear());

        let mut objects = vec![(Sphere::new(0.0, 1000.5, 1.0, 1000.0), Mirror::new(GROUND_ALBEDO))];
        match config.scene {
            SceneVariant::Ring => {
                objects.push((Sphere::new(0.0, 0.0, 1.0, 0.5), feature));
                let ring = std::f64::consts::SQRT_2;
                for k in 0..8 {
                    let angle = f64::from(k) * std::f64::consts::FRAC_PI_4;
                    objects.push((
                        Sphere::new(ring * angle.cos(), 0.3, 1.0 + ring * angle.sin(), 0.2),
                        small,
                    ));
                }
            }
            SceneVariant::Pillars => {
                objects.push((Sphere::new(0.0, 0.0, 3.0, 0.5), feature));
                for k in 0..5 {
                    let z = 1.5 + f64::from(k);
                    objects.push((Sphere::new(-1.2, 0.3, z, 0.2), small));
                    objects.push((Sphere::new(1.2, 0.3, z, 0.2), small));
                }
            }
            SceneVariant::Lone => {
                objects.push((Sphere::new(0.0, -0.3, 2.0, 0.8), feature));
            }
        }

        Self { objects, sky: Sky::from_config(config) }
    }

    /// Number of spheres, ground included.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The sky model.
    #[must_use]
    pub fn sky(&self) -> &Sky {
        &self.sky
    }

    /// Nearest surface in front of the ray.
    #[must_use]
    pub fn nearest_hit(&self, ray: &Ray) -> Option<Hit> {
        let mut best: Option<(f64, &(Sphere, Mirror))> = None;
        for object in &self.objects {
            if let Some(t) = object.0.intersect(ray) {
                if t > SELF_HIT_EPSILON && best.map_or(true, |(best_t, _)| t < best_t) {
                    best = Some((t, object));
                }
            }
        }
        best.map(|(t, (sphere, material))| {
            let point = ray.at(t);
            Hit { point, normal: sphere.normal_at(point), material: *material }
        })
    }

    /// Radiance arriving back along `ray`, following at most `max_bounces`
    /// surface interactions.
    #[must_use]
    pub fn trace(&self, ray: Ray, max_bounces: u32) -> Color {
        let mut throughput = Color::ONE;
        let mut ray = ray;
        for _ in 0..max_bounces {
            match self.nearest_hit(&ray) {
                None => return throughput.hadamard(self.sky.radiance(ray.direction)),
                Some(hit) => {
                    throughput = throughput.hadamard(hit.material.albedo);
                    ray = Ray::new(hit.point, ray.direction.reflect(hit.normal));
                }
            }
        }
        Color::ZERO
    }
}
