//! Core data types shared by the projection pipeline

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;

/// Color of one texture cell or one light element (8-bit RGB).
pub type Color = image::Rgb<u8>;

/// Black, the color of unpainted texture cells.
pub const BLACK: Color = image::Rgb([0, 0, 0]);

/// A light-emitting element fixed on the sphere surface.
///
/// The position is normalized on construction. A zero-length (or
/// non-finite) input position is kept as the zero vector and marked
/// degenerate; it projects to the texture center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Element {
    pub id: u32,
    pub strip_id: u32,
    pub strip_index: u32,
    position: Vec3,
}

impl Element {
    pub fn new(id: u32, strip_id: u32, strip_index: u32, raw_position: Vec3) -> Self {
        let position = raw_position.normalized().unwrap_or(Vec3::ZERO);
        Self { id, strip_id, strip_index, position }
    }

    /// Unit position on the sphere (zero for degenerate elements).
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn is_degenerate(&self) -> bool {
        self.position == Vec3::ZERO
    }
}

/// Texture coordinates of one element, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub element_id: u32,
    pub u: f64,
    pub v: f64,
}

/// Integer cell address in a texture of a given resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelAddress {
    pub px: u32,
    pub py: u32,
}

impl PixelAddress {
    pub const fn new(px: u32, py: u32) -> Self {
        Self { px, py }
    }
}

impl std::fmt::Display for PixelAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.px, self.py)
    }
}

/// A non-fatal problem found while loading input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub message: String,
    pub line: usize,
}
