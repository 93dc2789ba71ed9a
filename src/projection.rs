//! Sphere-to-panorama projection
//!
//! Converts a position on the sphere into equirectangular texture
//! coordinates `(u, v)`. Two interchangeable strategies sit behind the
//! [`Projection`] trait:
//!
//! - [`ExactProjection`]: `longitude = atan2(z, x)`, `latitude = asin(y)`
//! - [`FastProjection`]: single-argument `atan` with quadrant fix-up for
//!   longitude and the rational `y / sqrt(1 - y²)` approximation for
//!   latitude away from the poles
//!
//! Both map longitude `[-π, π]` to `u = (lon + π) / 2π` and latitude
//! `[-π/2, π/2]` to `v = (lat + π/2) / π`, clamped to `[0, 1]`.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;
use crate::geometry::{Orientation, Vec3};
use crate::models::{Element, ProjectionResult};

/// Normalized texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uv {
    pub u: f64,
    pub v: f64,
}

impl Uv {
    /// Canonical coordinates for positions without a direction.
    pub const CENTER: Uv = Uv { u: 0.5, v: 0.5 };
}

/// Which projection implementation to use.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionStrategy {
    /// Library `atan2` / `asin`
    Exact,
    /// Reduced-cost approximation
    #[default]
    Fast,
}

impl fmt::Display for ProjectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionStrategy::Exact => write!(f, "exact"),
            ProjectionStrategy::Fast => write!(f, "fast"),
        }
    }
}

impl ProjectionStrategy {
    /// Build the projection for this strategy with the given settings.
    pub fn build(self, config: &ProjectionConfig) -> Box<dyn Projection> {
        match self {
            ProjectionStrategy::Exact => Box::new(ExactProjection),
            ProjectionStrategy::Fast => {
                Box::new(FastProjection::new(config.rational_latitude_limit))
            }
        }
    }
}

/// A sphere-to-texture projection.
pub trait Projection: Send + Sync + fmt::Debug {
    fn strategy(&self) -> ProjectionStrategy;

    /// Longitude and latitude in radians of a unit vector.
    fn angles(&self, unit: Vec3) -> (f64, f64);

    /// Project an arbitrary position. The input is normalized first; a
    /// zero-length vector yields [`Uv::CENTER`].
    fn project(&self, position: Vec3) -> Uv {
        match position.normalized() {
            Some(unit) => {
                let (longitude, latitude) = self.angles(unit);
                uv_from_angles(longitude, latitude)
            }
            None => Uv::CENTER,
        }
    }
}

/// Projection using the library inverse trigonometric functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactProjection;

impl Projection for ExactProjection {
    fn strategy(&self) -> ProjectionStrategy {
        ProjectionStrategy::Exact
    }

    fn angles(&self, unit: Vec3) -> (f64, f64) {
        let longitude = unit.z.atan2(unit.x);
        let latitude = unit.y.clamp(-1.0, 1.0).asin();
        (longitude, latitude)
    }
}

/// Largest `|y|` for which the rational latitude stays within 0.01 of `v`.
///
/// The error reaches 0.0093 at 0.42 and passes 0.01 near 0.43. Layouts
/// calibrated against the 0.7 firmware cutover set it explicitly.
pub const DEFAULT_RATIONAL_LATITUDE_LIMIT: f64 = 0.42;

/// Projection trading accuracy for speed.
#[derive(Debug, Clone, Copy)]
pub struct FastProjection {
    /// `|y|` below which the rational latitude approximation is used.
    rational_latitude_limit: f64,
}

impl Default for FastProjection {
    fn default() -> Self {
        Self::new(DEFAULT_RATIONAL_LATITUDE_LIMIT)
    }
}

impl FastProjection {
    pub fn new(rational_latitude_limit: f64) -> Self {
        Self { rational_latitude_limit }
    }

    pub fn rational_latitude_limit(&self) -> f64 {
        self.rational_latitude_limit
    }
}

impl Projection for FastProjection {
    fn strategy(&self) -> ProjectionStrategy {
        ProjectionStrategy::Fast
    }

    fn angles(&self, unit: Vec3) -> (f64, f64) {
        let longitude = fast_longitude(unit.x, unit.z);
        let latitude = fast_latitude(unit.y, self.rational_latitude_limit);
        (longitude, latitude)
    }
}

/// Longitude from the dominant axis, without a four-quadrant `atan2`.
///
/// The `x < 0` branch lands in `(π/2, 3π/2)`; it is wrapped back into
/// `(-π, π]` so both strategies share one `u` convention.
fn fast_longitude(x: f64, z: f64) -> f64 {
    if x == 0.0 && z == 0.0 {
        return 0.0;
    }
    let longitude = if x.abs() >= z.abs() {
        let base = (z / x).atan();
        if x > 0.0 {
            base
        } else {
            base + PI
        }
    } else {
        let base = (x / z).atan();
        if z > 0.0 {
            FRAC_PI_2 - base
        } else {
            -FRAC_PI_2 - base
        }
    };
    if longitude > PI {
        longitude - TAU
    } else {
        longitude
    }
}

/// Latitude via `y / sqrt(1 - y²)` near the equator, exact `asin` near the poles.
fn fast_latitude(y: f64, rational_limit: f64) -> f64 {
    let y = y.clamp(-1.0, 1.0);
    if y.abs() < rational_limit {
        y / (1.0 - y * y).sqrt()
    } else {
        y.asin()
    }
}

/// Map angles in radians to clamped texture coordinates.
pub fn uv_from_angles(longitude: f64, latitude: f64) -> Uv {
    let u = (longitude + PI) / TAU;
    let v = (latitude + FRAC_PI_2) / PI;
    Uv { u: clamp_unit(u), v: clamp_unit(v) }
}

/// Inverse of [`uv_from_angles`]: `(longitude, latitude)` in radians.
pub fn angles_from_uv(uv: Uv) -> (f64, f64) {
    (uv.u * TAU - PI, uv.v * PI - FRAC_PI_2)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Project every element, rotating by `orientation` first.
///
/// The output is index-aligned with `elements`.
pub fn project_elements(
    elements: &[Element],
    projection: &dyn Projection,
    orientation: &Orientation,
) -> Vec<ProjectionResult> {
    elements
        .iter()
        .map(|element| {
            let uv = projection.project(orientation.rotate(element.position()));
            ProjectionResult { element_id: element.id, u: uv.u, v: uv.v }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn both() -> [Box<dyn Projection>; 2] {
        [Box::new(ExactProjection), Box::new(FastProjection::default())]
    }

    #[test]
    fn test_exact_negative_z_axis() {
        let uv = ExactProjection.project(Vec3::new(0.0, 0.0, -1.0));
        assert!((uv.u - 0.25).abs() < EPS);
        assert!((uv.v - 0.5).abs() < EPS);
    }

    #[test]
    fn test_exact_positive_x_axis() {
        let uv = ExactProjection.project(Vec3::new(1.0, 0.0, 0.0));
        assert!((uv.u - 0.5).abs() < EPS);
        assert!((uv.v - 0.5).abs() < EPS);
    }

    #[test]
    fn test_poles() {
        for p in both() {
            let north = p.project(Vec3::new(0.0, 1.0, 0.0));
            let south = p.project(Vec3::new(0.0, -1.0, 0.0));
            assert!((north.v - 1.0).abs() < EPS, "{:?}", p);
            assert!(south.v.abs() < EPS, "{:?}", p);
            assert!((north.u - 0.5).abs() < EPS, "{:?}", p);
        }
    }

    #[test]
    fn test_zero_vector_is_center() {
        for p in both() {
            assert_eq!(p.project(Vec3::ZERO), Uv::CENTER);
        }
    }

    #[test]
    fn test_input_is_normalized() {
        for p in both() {
            let a = p.project(Vec3::new(0.3, 0.2, -0.4));
            let b = p.project(Vec3::new(30.0, 20.0, -40.0));
            assert!((a.u - b.u).abs() < EPS && (a.v - b.v).abs() < EPS);
        }
    }

    #[test]
    fn test_fast_longitude_matches_atan2_in_every_quadrant() {
        let samples = [(1.0, 0.2), (0.2, 1.0), (-0.2, 1.0), (-1.0, 0.2), (-1.0, -0.2), (-0.2, -1.0), (0.2, -1.0), (1.0, -0.2)];
        for (x, z) in samples {
            let expected = f64::atan2(z, x);
            assert!((fast_longitude(x, z) - expected).abs() < 1e-12, "x={} z={}", x, z);
        }
    }

    #[test]
    fn test_fast_longitude_negative_x_axis() {
        // atan(0/-1) + π = π, stays at the seam
        assert!((fast_longitude(-1.0, 0.0) - PI).abs() < EPS);
    }

    #[test]
    fn test_fast_latitude_switches_to_asin_near_poles() {
        assert_eq!(fast_latitude(0.8, 0.7), 0.8f64.asin());
        let y: f64 = 0.3;
        assert_eq!(fast_latitude(y, 0.7), y / (1.0 - y * y).sqrt());
    }

    #[test]
    fn test_default_limit_keeps_latitude_within_bound() {
        let limit = DEFAULT_RATIONAL_LATITUDE_LIMIT;
        let just_below = limit - 1e-9;
        let error = (fast_latitude(just_below, limit) - just_below.asin()).abs() / PI;
        assert!(error < 0.01, "error {} at |y| = {}", error, just_below);
        assert_eq!(fast_latitude(0.6, limit), 0.6f64.asin());
    }

    #[test]
    fn test_angles_roundtrip() {
        let p = Vec3::new(0.3, -0.6, 0.74).normalized().unwrap();
        let (lon, lat) = ExactProjection.angles(p);
        let (lon2, lat2) = angles_from_uv(uv_from_angles(lon, lat));
        assert!((lon - lon2).abs() < 1e-12);
        assert!((lat - lat2).abs() < 1e-12);
    }

    #[test]
    fn test_strategy_build() {
        let config = ProjectionConfig::default();
        assert_eq!(ProjectionStrategy::Exact.build(&config).strategy(), ProjectionStrategy::Exact);
        assert_eq!(ProjectionStrategy::Fast.build(&config).strategy(), ProjectionStrategy::Fast);
    }

    #[test]
    fn test_project_elements_applies_orientation() {
        let elements = [Element::new(4, 0, 0, Vec3::new(1.0, 0.0, 0.0))];
        let quarter = Orientation::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), FRAC_PI_2);
        let results = project_elements(&elements, &ExactProjection, &quarter);
        // +x is rotated onto -z, which sits at u = 0.25
        assert_eq!(results[0].element_id, 4);
        assert!((results[0].u - 0.25).abs() < 1e-12);
    }
}
