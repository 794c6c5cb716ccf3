//! Vector math for the tracer.
//!
//! World space is right-handed with +z pointing away from the camera and
//! +y pointing *down* the image, so image rows and world y agree.

/// 3D vector - points, directions and linear RGB radiance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

/// Linear RGB radiance. Channels are nominally in `0.0..=1.0`.
pub type Color = Vec3;

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// All-ones vector (white radiance)
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Dot product
    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Length squared (avoids sqrt)
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[inline]
    #[must_use]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction.
    ///
    /// The zero vector has no direction and yields NaN components; callers
    /// that can produce it must check [`Vec3::is_finite`].
    #[inline]
    #[must_use]
    pub fn normalized(self) -> Self {
        self / self.length()
    }

    /// Projection of `self` onto `onto`.
    #[inline]
    #[must_use]
    pub fn project(self, onto: Self) -> Self {
        onto * (self.dot(onto) / onto.length_squared())
    }

    /// Mirror reflection of `self` about the plane with normal `normal`.
    #[inline]
    #[must_use]
    pub fn reflect(self, normal: Self) -> Self {
        self - self.project(normal) * 2.0
    }

    /// Component-wise product; used to filter radiance through an albedo.
    #[inline]
    #[must_use]
    pub fn hadamard(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    /// Linear interpolation from `self` (t = 0) to `other` (t = 1).
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self * (1.0 - t) + other * t
    }

    /// True if no component is NaN or infinite.
    #[inline]
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl std::ops::DivAssign<f64> for Vec3 {
    fn div_assign(&mut self, rhs: f64) {
        self.x /= rhs;
        self.y /= rhs;
        self.z /= rhs;
    }
}

/// A half-line: `origin + t * direction` for `t > 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Direction (not necessarily unit length)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at parameter `t` along the ray.
    #[inline]
    #[must_use]
    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a.dot(b), 32.0); // 1*4 + 2*5 + 3*6
        assert_eq!(a.hadamard(b), Vec3::new(4.0, 10.0, 18.0));
    }

    #[test]
    fn test_reflect_flips_normal_component() {
        let incoming = Vec3::new(1.0, 1.0, 0.0);
        let normal = Vec3::new(0.0, -3.0, 0.0);
        assert_eq!(incoming.reflect(normal), Vec3::new(1.0, -1.0, 0.0));
    }

    #[test]
    fn test_normalized_zero_is_not_finite() {
        assert!(!Vec3::ZERO.normalized().is_finite());
        assert!((Vec3::new(3.0, 0.0, 4.0).normalized().length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(ray.at(1.5), Vec3::new(0.0, 0.0, 3.0));
    }
}
