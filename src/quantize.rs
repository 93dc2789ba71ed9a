//! Quantization of texture coordinates into pixel addresses
//!
//! `px = floor(u * width)` and `py = floor(v * height)`, each clamped to
//! the last valid cell. Several hundred elements against tens of
//! thousands of cells rarely collide overall, but elements mounted along
//! the same meridian routinely share a column band.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{PixelAddress, ProjectionResult};
use crate::projection::Uv;

/// Texture dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self { width: 320, height: 160 }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pixel addresses shared by more than one element, keyed by address.
pub type CollisionMap = BTreeMap<PixelAddress, BTreeSet<u32>>;

/// Quantize one coordinate pair against `resolution`.
pub fn quantize(uv: Uv, resolution: Resolution) -> PixelAddress {
    PixelAddress {
        px: quantize_axis(uv.u, resolution.width),
        py: quantize_axis(uv.v, resolution.height),
    }
}

fn quantize_axis(value: f64, dimension: u32) -> u32 {
    let last = dimension.saturating_sub(1);
    // `as` saturates: negatives and NaN become 0
    let cell = (value * dimension as f64).floor() as u32;
    cell.min(last)
}

/// Quantize a projection result.
pub fn quantize_result(result: &ProjectionResult, resolution: Resolution) -> PixelAddress {
    quantize(Uv { u: result.u, v: result.v }, resolution)
}

/// Quantize every projection result; output is index-aligned with the input.
pub fn quantize_all(results: &[ProjectionResult], resolution: Resolution) -> Vec<PixelAddress> {
    results.iter().map(|r| quantize_result(r, resolution)).collect()
}

/// Group element ids by pixel address.
pub fn group_by_address(results: &[ProjectionResult], resolution: Resolution) -> CollisionMap {
    let mut groups: CollisionMap = BTreeMap::new();
    for result in results {
        groups.entry(quantize_result(result, resolution)).or_default().insert(result.element_id);
    }
    groups
}

/// Addresses holding more than one element, with the ids quantizing there.
pub fn collision_report(results: &[ProjectionResult], resolution: Resolution) -> CollisionMap {
    let mut groups = group_by_address(results, resolution);
    groups.retain(|_, ids| ids.len() > 1);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: u32, u: f64, v: f64) -> ProjectionResult {
        ProjectionResult { element_id: id, u, v }
    }

    #[test]
    fn test_quantize_quarter() {
        let addr = quantize(Uv { u: 0.25, v: 0.5 }, Resolution::new(320, 160));
        assert_eq!(addr, PixelAddress::new(80, 80));
    }

    #[test]
    fn test_quantize_clamps_upper_edge() {
        let addr = quantize(Uv { u: 1.0, v: 1.0 }, Resolution::new(320, 160));
        assert_eq!(addr, PixelAddress::new(319, 159));
    }

    #[test]
    fn test_quantize_clamps_out_of_range() {
        let res = Resolution::new(320, 160);
        assert_eq!(quantize(Uv { u: -0.3, v: 7.0 }, res), PixelAddress::new(0, 159));
        assert_eq!(quantize(Uv { u: f64::NAN, v: 0.0 }, res), PixelAddress::new(0, 0));
    }

    #[test]
    fn test_quantize_zero_dimension() {
        let addr = quantize(Uv { u: 0.7, v: 0.7 }, Resolution::new(0, 0));
        assert_eq!(addr, PixelAddress::new(0, 0));
    }

    #[test]
    fn test_quantize_all_index_aligned() {
        let results = [result(9, 0.0, 0.0), result(3, 0.5, 0.5)];
        let addrs = quantize_all(&results, Resolution::new(10, 10));
        assert_eq!(addrs, vec![PixelAddress::new(0, 0), PixelAddress::new(5, 5)]);
    }

    #[test]
    fn test_collision_report_only_shared_cells() {
        let results = [
            result(1, 0.251, 0.5),
            result(2, 0.2515, 0.5001),
            result(3, 0.75, 0.5),
            result(4, 0.2512, 0.5),
        ];
        let report = collision_report(&results, Resolution::new(320, 160));
        assert_eq!(report.len(), 1);
        let ids = report.get(&PixelAddress::new(80, 80)).unwrap();
        assert_eq!(ids.iter().copied().collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn test_collision_report_depends_on_resolution() {
        let results = [result(1, 0.1, 0.5), result(2, 0.12, 0.5)];
        assert_eq!(collision_report(&results, Resolution::new(10, 10)).len(), 1);
        assert!(collision_report(&results, Resolution::new(320, 160)).is_empty());
    }

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::default().to_string(), "320x160");
        assert_eq!(Resolution::default().cell_count(), 51200);
    }
}
