//! Feature band coverage
//!
//! A feature (a ring painted at a nominal longitude) owns every element
//! whose true longitude lies within its tolerance. Quantization spreads
//! those elements over several columns, so the painted band must span all
//! of them; members outside the band are "starved" and sample whatever
//! else sits in their cell.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::FeatureConfig;
use crate::frame::{band_columns, TextureFrame};
use crate::models::{Color, PixelAddress};
use crate::projection::Uv;
use crate::quantize::{quantize, Resolution};
use crate::sampler::sample;

/// Inclusive column range; wraps across the seam when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnBand {
    pub start: u32,
    pub end: u32,
}

impl ColumnBand {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn single(px: u32) -> Self {
        Self { start: px, end: px }
    }

    /// Number of columns covered in a texture `texture_width` wide.
    pub fn width(&self, texture_width: u32) -> u32 {
        if self.start <= self.end {
            self.end - self.start + 1
        } else {
            texture_width.saturating_sub(self.start) + self.end + 1
        }
    }

    pub fn contains(&self, px: u32) -> bool {
        if self.start <= self.end {
            (self.start..=self.end).contains(&px)
        } else {
            px >= self.start || px <= self.end
        }
    }

    pub fn columns(&self, texture_width: u32) -> Vec<u32> {
        band_columns(self.start, self.end, texture_width)
    }

    /// Smallest band covering every column in `columns`, seam aware.
    ///
    /// Returns `None` for an empty set.
    pub fn spanning(columns: &BTreeSet<u32>, texture_width: u32) -> Option<Self> {
        let sorted: Vec<u32> = columns.iter().copied().collect();
        let (&first, &last) = (sorted.first()?, sorted.last()?);

        // The band starts right after the widest empty gap, counting the
        // gap that wraps from the last column back to the first.
        let mut best_gap = texture_width.saturating_sub(last) + first;
        let mut band = ColumnBand::new(first, last);
        for pair in sorted.windows(2) {
            let gap = pair[1] - pair[0];
            if gap > best_gap {
                best_gap = gap;
                band = ColumnBand::new(pair[1], pair[0]);
            }
        }
        Some(band)
    }
}

impl std::fmt::Display for ColumnBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// An element assigned to a feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureMember {
    pub element_id: u32,
    /// Exact longitude of the element in degrees
    pub longitude_deg: f64,
    pub uv: Uv,
    pub address: PixelAddress,
}

/// Coverage of one feature by its painted band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCoverage {
    pub name: String,
    pub longitude_deg: f64,
    pub tolerance_deg: f64,
    pub texture_width: u32,
    /// Column of the nominal longitude
    pub nominal_px: u32,
    /// Painted band; the nominal column alone when none is configured
    pub painted: ColumnBand,
    pub color: [u8; 3],
    pub members: Vec<FeatureMember>,
    /// Columns the members actually quantize to
    pub observed: Option<ColumnBand>,
    /// Members whose column lies outside the painted band
    pub starved: Vec<u32>,
}

/// Angular members of a feature: `(element_id, exact longitude in
/// degrees, projected coordinates)` for every candidate within tolerance.
pub(crate) fn select_members(
    feature_longitude_deg: f64,
    tolerance_deg: f64,
    candidates: impl IntoIterator<Item = (u32, f64, Uv)>,
    resolution: Resolution,
) -> Vec<FeatureMember> {
    candidates
        .into_iter()
        .filter(|&(_, longitude_deg, _)| {
            longitude_difference_deg(longitude_deg, feature_longitude_deg) <= tolerance_deg
        })
        .map(|(element_id, longitude_deg, uv)| FeatureMember {
            element_id,
            longitude_deg,
            uv,
            address: quantize(uv, resolution),
        })
        .collect()
}

/// Absolute difference of two longitudes in degrees, wrapped into `[0, 180]`.
pub fn longitude_difference_deg(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

impl FeatureCoverage {
    /// Evaluate `feature` against its already-selected members.
    pub fn evaluate(
        feature: &FeatureConfig,
        tolerance_deg: f64,
        members: Vec<FeatureMember>,
        resolution: Resolution,
    ) -> Self {
        let nominal_px = feature.nominal_column(resolution);
        let [start, end] = feature.painted_columns(resolution);
        let painted = ColumnBand::new(start, end);

        let columns: BTreeSet<u32> = members.iter().map(|m| m.address.px).collect();
        let observed = ColumnBand::spanning(&columns, resolution.width);
        let starved = members
            .iter()
            .filter(|m| !painted.contains(m.address.px))
            .map(|m| m.element_id)
            .collect();

        Self {
            name: feature.name.clone(),
            longitude_deg: feature.longitude_deg,
            tolerance_deg,
            texture_width: resolution.width,
            nominal_px,
            painted,
            color: feature.color,
            members,
            observed,
            starved,
        }
    }

    /// True when every member samples inside the painted band.
    pub fn is_covered(&self) -> bool {
        self.starved.is_empty()
    }

    /// The narrowest band reaching every member.
    pub fn recommended_band(&self) -> Option<ColumnBand> {
        self.observed
    }

    /// Width of [`recommended_band`](Self::recommended_band); 0 without members.
    pub fn recommended_width(&self) -> u32 {
        self.observed.map(|band| band.width(self.texture_width)).unwrap_or(0)
    }

    pub fn painted_width(&self) -> u32 {
        self.painted.width(self.texture_width)
    }

    /// Sample a painted frame at every member's cell and return the ids of
    /// members that did not receive the feature color.
    ///
    /// Members are requantized when the frame resolution differs from the
    /// one the coverage was computed for.
    pub fn verify_with_frame(&self, frame: &TextureFrame) -> Vec<u32> {
        let expected: Color = image::Rgb(self.color);
        let resolution = frame.resolution();
        self.members
            .iter()
            .filter(|member| sample(frame, quantize(member.uv, resolution)) != expected)
            .map(|member| member.element_id)
            .collect()
    }
}

/// Two features whose painted bands share columns.
///
/// Elements in the shared columns would show a blend of both features'
/// intent, whichever was painted last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandOverlap {
    pub first: String,
    pub second: String,
    pub columns: Vec<u32>,
}

/// Find every pair of configured features with overlapping bands.
pub fn find_band_overlaps(features: &[FeatureConfig], texture_width: u32) -> Vec<BandOverlap> {
    let banded: Vec<(&str, BTreeSet<u32>)> = features
        .iter()
        .filter_map(|f| {
            f.band.map(|[start, end]| {
                (f.name.as_str(), band_columns(start, end, texture_width).into_iter().collect())
            })
        })
        .collect();

    let mut overlaps = Vec::new();
    for (i, (first, a)) in banded.iter().enumerate() {
        for (second, b) in &banded[i + 1..] {
            let columns: Vec<u32> = a.intersection(b).copied().collect();
            if !columns.is_empty() {
                overlaps.push(BandOverlap {
                    first: first.to_string(),
                    second: second.to_string(),
                    columns,
                });
            }
        }
    }
    overlaps
}
