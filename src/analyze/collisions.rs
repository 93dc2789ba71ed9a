//! Collision statistics and meridian clustering

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{PixelAddress, ProjectionResult};
use crate::projection::ProjectionStrategy;
use crate::quantize::{group_by_address, quantize_result, Resolution};

/// Elements sharing one pixel address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionGroup {
    pub address: PixelAddress,
    pub element_ids: Vec<u32>,
}

/// Collision statistics for one layout at one resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollisionSummary {
    pub resolution: Resolution,
    pub strategy: ProjectionStrategy,
    /// Elements analyzed
    pub element_count: usize,
    /// Distinct cells holding at least one element
    pub occupied_cells: usize,
    /// Cells holding more than one element
    pub colliding_cells: usize,
    /// Elements sharing their cell with another element
    pub colliding_elements: usize,
    /// Colliding cells as a share of occupied cells
    pub percent_cells_affected: f64,
    /// Colliding cells as a share of every cell in the texture
    pub percent_texture_affected: f64,
    /// Colliding elements as a share of all elements
    pub percent_elements_affected: f64,
    /// Size of the largest group (0 when nothing collides)
    pub largest_group: usize,
    pub groups: Vec<CollisionGroup>,
}

impl CollisionSummary {
    /// Summarize already-projected results.
    pub fn from_results(
        results: &[ProjectionResult],
        resolution: Resolution,
        strategy: ProjectionStrategy,
    ) -> Self {
        let grouped = group_by_address(results, resolution);
        let occupied_cells = grouped.len();

        let groups: Vec<CollisionGroup> = grouped
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(address, ids)| CollisionGroup { address, element_ids: ids.into_iter().collect() })
            .collect();

        let colliding_cells = groups.len();
        let colliding_elements = groups.iter().map(|g| g.element_ids.len()).sum();
        let largest_group = groups.iter().map(|g| g.element_ids.len()).max().unwrap_or(0);

        Self {
            resolution,
            strategy,
            element_count: results.len(),
            occupied_cells,
            colliding_cells,
            colliding_elements,
            percent_cells_affected: percentage(colliding_cells, occupied_cells as u64),
            percent_texture_affected: percentage(colliding_cells, resolution.cell_count()),
            percent_elements_affected: percentage(colliding_elements, results.len() as u64),
            largest_group,
            groups,
        }
    }

    pub fn has_collisions(&self) -> bool {
        !self.groups.is_empty()
    }
}

fn percentage(count: usize, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64) * 100.0
}

/// A run of columns where many elements share nearly one longitude.
///
/// `start_px..=end_px` wraps across the seam when `start_px > end_px`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeridianCluster {
    pub center_px: u32,
    pub start_px: u32,
    pub end_px: u32,
    pub element_ids: Vec<u32>,
}

impl MeridianCluster {
    pub fn len(&self) -> usize {
        self.element_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.element_ids.is_empty()
    }
}

/// Find column windows of `2 * half_width + 1` holding at least
/// `threshold` elements.
///
/// Windows are taken densest first; a window whose center lies within
/// `2 * half_width` columns of an accepted one is dropped, so each
/// cluster is reported once. Results stay in that order, densest first,
/// with ties broken by center column.
pub fn find_meridian_clusters(
    results: &[ProjectionResult],
    resolution: Resolution,
    half_width: u32,
    threshold: usize,
) -> Vec<MeridianCluster> {
    let width = resolution.width;
    if width == 0 || threshold == 0 {
        return Vec::new();
    }
    // A window never needs to reach past the opposite meridian.
    let half_width = half_width.min(width.saturating_sub(1) / 2);

    let mut columns: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for result in results {
        columns.entry(quantize_result(result, resolution).px).or_default().insert(result.element_id);
    }

    let window_columns = |center: u32| -> Vec<u32> {
        let mut cols: Vec<u32> = (-(half_width as i64)..=half_width as i64)
            .map(|offset| (center as i64 + offset).rem_euclid(width as i64) as u32)
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    };

    let mut candidates: Vec<(u32, BTreeSet<u32>)> = (0..width)
        .filter(|&center| columns.contains_key(&center))
        .map(|center| {
            let ids: BTreeSet<u32> = window_columns(center)
                .iter()
                .filter_map(|col| columns.get(col))
                .flatten()
                .copied()
                .collect();
            (center, ids)
        })
        .filter(|(_, ids)| ids.len() >= threshold)
        .collect();
    candidates.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

    let separation = 2 * half_width;
    let mut accepted: Vec<MeridianCluster> = Vec::new();
    for (center, ids) in candidates {
        let overlaps = accepted
            .iter()
            .any(|cluster| column_distance(cluster.center_px, center, width) <= separation);
        if overlaps {
            continue;
        }
        accepted.push(MeridianCluster {
            center_px: center,
            start_px: (center + width - half_width) % width,
            end_px: (center + half_width) % width,
            element_ids: ids.into_iter().collect(),
        });
    }

    accepted
}

/// Distance between two columns on the wrapped longitude axis.
pub(crate) fn column_distance(a: u32, b: u32, width: u32) -> u32 {
    let direct = a.abs_diff(b);
    direct.min(width.saturating_sub(direct))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: u32, u: f64, v: f64) -> ProjectionResult {
        ProjectionResult { element_id: id, u, v }
    }

    #[test]
    fn test_summary_without_collisions() {
        let results = [at(0, 0.1, 0.5), at(1, 0.6, 0.5)];
        let summary = CollisionSummary::from_results(&results, Resolution::default(), ProjectionStrategy::Exact);
        assert_eq!(summary.occupied_cells, 2);
        assert!(!summary.has_collisions());
        assert_eq!(summary.largest_group, 0);
        assert_eq!(summary.percent_elements_affected, 0.0);
    }

    #[test]
    fn test_summary_percentages() {
        let res = Resolution::new(10, 10);
        let results = [
            at(0, 0.05, 0.05),
            at(1, 0.05, 0.05),
            at(2, 0.05, 0.05),
            at(3, 0.55, 0.55),
            at(4, 0.55, 0.55),
            at(5, 0.95, 0.95),
        ];
        let summary = CollisionSummary::from_results(&results, res, ProjectionStrategy::Fast);
        assert_eq!(summary.element_count, 6);
        assert_eq!(summary.occupied_cells, 3);
        assert_eq!(summary.colliding_cells, 2);
        assert_eq!(summary.colliding_elements, 5);
        assert_eq!(summary.largest_group, 3);
        assert!((summary.percent_cells_affected - 200.0 / 3.0).abs() < 1e-9);
        assert!((summary.percent_texture_affected - 2.0).abs() < 1e-9);
        assert!((summary.percent_elements_affected - 500.0 / 6.0).abs() < 1e-9);
        assert_eq!(summary.groups[0].address, PixelAddress::new(0, 0));
        assert_eq!(summary.groups[0].element_ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_summary_empty_layout() {
        let summary = CollisionSummary::from_results(&[], Resolution::default(), ProjectionStrategy::Fast);
        assert_eq!(summary.percent_cells_affected, 0.0);
        assert_eq!(summary.percent_elements_affected, 0.0);
    }

    fn column(id: u32, px: u32, width: u32) -> ProjectionResult {
        at(id, (px as f64 + 0.5) / width as f64, 0.5 + id as f64 * 0.001)
    }

    #[test]
    fn test_meridian_cluster_found_once() {
        let width = 320;
        let mut results: Vec<ProjectionResult> =
            (0..12).map(|i| column(i, 78 + i % 5, width)).collect();
        results.push(column(100, 200, width));
        let clusters = find_meridian_clusters(&results, Resolution::new(width, 160), 2, 10);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].center_px, 80);
        assert_eq!((clusters[0].start_px, clusters[0].end_px), (78, 82));
        assert_eq!(clusters[0].len(), 12);
    }

    #[test]
    fn test_meridian_clusters_listed_densest_first() {
        let width = 320;
        let mut results: Vec<ProjectionResult> = (0..4).map(|i| column(i, 40, width)).collect();
        results.extend((10..16).map(|i| column(i, 200, width)));
        let clusters = find_meridian_clusters(&results, Resolution::new(width, 160), 2, 4);
        let centers: Vec<u32> = clusters.iter().map(|c| c.center_px).collect();
        assert_eq!(centers, vec![200, 40]);
        assert_eq!((clusters[0].len(), clusters[1].len()), (6, 4));
    }

    #[test]
    fn test_meridian_cluster_below_threshold() {
        let results: Vec<ProjectionResult> = (0..5).map(|i| column(i, 40, 320)).collect();
        assert!(find_meridian_clusters(&results, Resolution::new(320, 160), 2, 10).is_empty());
    }

    #[test]
    fn test_meridian_cluster_across_seam() {
        let width = 320;
        let results: Vec<ProjectionResult> =
            [318, 319, 0, 1].iter().enumerate().map(|(i, &px)| column(i as u32, px, width)).collect();
        let clusters = find_meridian_clusters(&results, Resolution::new(width, 160), 2, 4);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 4);
        assert!(clusters[0].start_px > clusters[0].end_px);
    }

    #[test]
    fn test_oversized_half_width_is_clamped() {
        let width = 320;
        let results: Vec<ProjectionResult> = (0..3).map(|i| column(i, 10 + i * 100, width)).collect();
        let clusters = find_meridian_clusters(&results, Resolution::new(width, 160), u32::MAX, 3);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
        assert_eq!((clusters[0].start_px, clusters[0].end_px), (171, 169));
    }

    #[test]
    fn test_column_distance_wraps() {
        assert_eq!(column_distance(1, 318, 320), 3);
        assert_eq!(column_distance(10, 20, 320), 10);
    }
}
