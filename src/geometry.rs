//! Vector and rotation primitives for positions on the unit sphere
//!
//! The sphere uses a right-handed frame with `y` as the polar axis:
//! latitude is measured from the `xz` plane towards `+y`, and longitude is
//! `atan2(z, x)`.

use serde::{Deserialize, Serialize};

/// A 3D vector of 64-bit floats.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn scale(self, factor: f64) -> Vec3 {
        Vec3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    pub fn add(self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// True when every component is finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Divide by the vector length.
    ///
    /// Returns `None` for zero-length or non-finite vectors, which have no
    /// direction on the sphere.
    pub fn normalized(self) -> Option<Vec3> {
        let length = self.length();
        if length == 0.0 || !length.is_finite() {
            return None;
        }
        Some(self.scale(1.0 / length))
    }
}

/// Rotation of the whole sphere, stored as a unit quaternion `(w, x, y, z)`.
///
/// Applied to every element before projection so the panorama can be
/// re-aimed without touching the layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Orientation {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 4]> for Orientation {
    fn from(q: [f64; 4]) -> Self {
        Self { w: q[0], x: q[1], y: q[2], z: q[3] }
    }
}

impl From<Orientation> for [f64; 4] {
    fn from(q: Orientation) -> Self {
        [q.w, q.x, q.y, q.z]
    }
}

impl Orientation {
    pub const IDENTITY: Orientation = Orientation { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    /// Rotation of `angle` radians around `axis` (right-hand rule).
    ///
    /// A zero-length axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        match axis.normalized() {
            Some(axis) => {
                let half = angle * 0.5;
                let s = half.sin();
                Self { w: half.cos(), x: axis.x * s, y: axis.y * s, z: axis.z * s }
            }
            None => Self::IDENTITY,
        }
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Scale to unit length, or `None` for a zero quaternion.
    pub fn normalized(&self) -> Option<Orientation> {
        let n = self.norm();
        if n == 0.0 || !n.is_finite() {
            return None;
        }
        Some(Self { w: self.w / n, x: self.x / n, y: self.y / n, z: self.z / n })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Rotate `v` by this quaternion.
    ///
    /// Uses `v' = v + 2 q × (q × v + w v)` with `q = (x, y, z)`; the
    /// quaternion is assumed to be unit length.
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        if self.is_identity() {
            return v;
        }
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v).add(v.scale(self.w));
        v.add(q.cross(t).scale(2.0))
    }
}
