//! Offline collision and coverage diagnostics
//!
//! Validates design parameters (texture resolution, feature band widths)
//! against a real layout:
//! - Collision statistics per pixel address
//! - Meridian clusters (many elements at nearly one longitude)
//! - Feature band coverage and minimum full-coverage band widths
//! - Differential comparison of the projection strategies

mod collisions;
mod coverage;
mod differential;
mod report;

pub use collisions::{find_meridian_clusters, CollisionGroup, CollisionSummary, MeridianCluster};
pub use coverage::{
    find_band_overlaps, longitude_difference_deg, BandOverlap, ColumnBand, FeatureCoverage,
    FeatureMember,
};
pub use differential::{Deviation, DifferentialReport};
pub use report::{
    format_differential_text, format_report_text, to_json, DiagnosticReport,
};

use crate::config::{FeatureConfig, SphereConfig};
use crate::geometry::Orientation;
use crate::models::{Element, ProjectionResult};
use crate::projection::{project_elements, ExactProjection, Projection, ProjectionStrategy};

/// Runs the diagnostics for one configuration.
#[derive(Debug)]
pub struct CollisionAnalyzer {
    config: SphereConfig,
    orientation: Orientation,
    projection: Box<dyn Projection>,
}

impl CollisionAnalyzer {
    /// Analyzer using the configured strategy.
    pub fn new(config: SphereConfig) -> Self {
        let strategy = config.projection.strategy;
        Self::with_strategy(config, strategy)
    }

    pub fn with_strategy(mut config: SphereConfig, strategy: ProjectionStrategy) -> Self {
        config.projection.strategy = strategy;
        let orientation = config.projection.orientation.normalized().unwrap_or(Orientation::IDENTITY);
        let projection = strategy.build(&config.projection);
        Self { config, orientation, projection }
    }

    pub fn config(&self) -> &SphereConfig {
        &self.config
    }

    pub fn strategy(&self) -> ProjectionStrategy {
        self.projection.strategy()
    }

    pub fn project(&self, elements: &[Element]) -> Vec<ProjectionResult> {
        project_elements(elements, self.projection.as_ref(), &self.orientation)
    }

    /// Collision statistics at the configured resolution.
    pub fn summarize(&self, elements: &[Element]) -> CollisionSummary {
        CollisionSummary::from_results(&self.project(elements), self.config.resolution(), self.strategy())
    }

    pub fn meridian_clusters(&self, elements: &[Element]) -> Vec<MeridianCluster> {
        let analysis = &self.config.analysis;
        find_meridian_clusters(
            &self.project(elements),
            self.config.resolution(),
            analysis.cluster_half_width,
            analysis.cluster_threshold,
        )
    }

    /// Coverage of `feature` by its painted band.
    ///
    /// Membership uses the exact longitude of each (rotated) element;
    /// columns come from the analyzer's strategy. Degenerate elements
    /// have no longitude and never belong to a feature.
    pub fn feature_coverage(&self, elements: &[Element], feature: &FeatureConfig) -> FeatureCoverage {
        let tolerance = feature.tolerance_deg.unwrap_or(self.config.analysis.default_tolerance_deg);
        let resolution = self.config.resolution();

        let candidates = elements.iter().filter(|e| !e.is_degenerate()).map(|element| {
            let position = self.orientation.rotate(element.position());
            let (longitude, _) = ExactProjection.angles(position);
            (element.id, longitude.to_degrees(), self.projection.project(position))
        });
        let members =
            coverage::select_members(feature.longitude_deg, tolerance, candidates, resolution);

        let coverage = FeatureCoverage::evaluate(feature, tolerance, members, resolution);
        if !coverage.is_covered() {
            log::warn!(
                "feature '{}': {} of {} element(s) fall outside band {}",
                coverage.name,
                coverage.starved.len(),
                coverage.members.len(),
                coverage.painted
            );
        }
        coverage
    }

    /// Coverage of every configured feature.
    pub fn coverage_all(&self, elements: &[Element]) -> Vec<FeatureCoverage> {
        self.config.features.iter().map(|f| self.feature_coverage(elements, f)).collect()
    }

    /// Compare the fast strategy against the exact one at the configured bound.
    pub fn compare_strategies(&self, elements: &[Element]) -> DifferentialReport {
        let fast = ProjectionStrategy::Fast.build(&self.config.projection);
        DifferentialReport::compare(
            elements,
            &ExactProjection,
            fast.as_ref(),
            &self.orientation,
            self.config.resolution(),
            self.config.projection.approximation_bound,
        )
    }

    /// Collisions, clusters, feature coverage and band overlaps in one report.
    pub fn report(&self, elements: &[Element]) -> DiagnosticReport {
        let results = self.project(elements);
        let resolution = self.config.resolution();
        let analysis = &self.config.analysis;
        DiagnosticReport {
            summary: CollisionSummary::from_results(&results, resolution, self.strategy()),
            clusters: find_meridian_clusters(
                &results,
                resolution,
                analysis.cluster_half_width,
                analysis.cluster_threshold,
            ),
            features: self.coverage_all(elements),
            band_overlaps: find_band_overlaps(&self.config.features, resolution.width),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::feature_test_pattern;
    use crate::geometry::Vec3;
    use crate::quantize::Resolution;
    use std::f64::consts::{PI, TAU};

    /// One equatorial element centered on each of the given columns.
    fn column_layout(columns: impl IntoIterator<Item = u32>, width: u32) -> Vec<Element> {
        columns
            .into_iter()
            .enumerate()
            .map(|(i, px)| {
                let u = (px as f64 + 0.5) / width as f64;
                let lon = u * TAU - PI;
                Element::new(i as u32, 0, i as u32, Vec3::new(lon.cos(), 0.0, lon.sin()))
            })
            .collect()
    }

    fn west_config(band: [u32; 2]) -> SphereConfig {
        let mut config = SphereConfig::default();
        config.projection.strategy = ProjectionStrategy::Exact;
        config.features =
            vec![FeatureConfig::new("west", -90.0).with_band(band[0], band[1]).with_color([0, 255, 0])];
        config
    }

    #[test]
    fn test_narrow_band_reports_starved_elements() {
        let elements = column_layout(74..=85, 320);
        let analyzer = CollisionAnalyzer::new(west_config([79, 79]));
        let coverage = analyzer.feature_coverage(&elements, &analyzer.config().features[0]);
        assert_eq!(coverage.members.len(), 12);
        assert!(coverage.starved.len() >= 8);
        assert_eq!(coverage.recommended_band(), Some(ColumnBand::new(74, 85)));
        assert_eq!(coverage.recommended_width(), 12);
    }

    #[test]
    fn test_recommended_band_covers_everything() {
        let elements = column_layout(74..=85, 320);
        let analyzer = CollisionAnalyzer::new(west_config([74, 85]));
        let coverage = analyzer.feature_coverage(&elements, &analyzer.config().features[0]);
        assert!(coverage.is_covered());

        let frame = feature_test_pattern(analyzer.config());
        assert!(coverage.verify_with_frame(&frame).is_empty());
    }

    #[test]
    fn test_fast_strategy_sees_same_columns_on_equator() {
        let elements = column_layout(74..=85, 320);
        let mut config = west_config([74, 85]);
        config.projection.strategy = ProjectionStrategy::Fast;
        let coverage = CollisionAnalyzer::new(config.clone()).feature_coverage(&elements, &config.features[0]);
        assert!(coverage.is_covered());
    }

    #[test]
    fn test_degenerate_elements_never_members() {
        let mut elements = column_layout(80..=80, 320);
        elements.push(Element::new(99, 0, 0, Vec3::ZERO));
        let analyzer = CollisionAnalyzer::new(west_config([74, 85]));
        let coverage = analyzer.feature_coverage(&elements, &analyzer.config().features[0]);
        assert_eq!(coverage.members.len(), 1);
    }

    #[test]
    fn test_orientation_moves_membership() {
        // Elements sit at +90 degrees; a half turn about y brings them to -90.
        let elements = column_layout(238..=241, 320);
        let mut config = west_config([78, 81]);
        config.projection.orientation = Orientation::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), PI);
        let analyzer = CollisionAnalyzer::new(config);
        let coverage = analyzer.feature_coverage(&elements, &analyzer.config().features[0]);
        assert_eq!(coverage.members.len(), 4);
        assert!(coverage.is_covered());
    }

    #[test]
    fn test_identical_positions_collide() {
        let mut elements = column_layout([10, 10, 200], 320);
        elements[1] = Element::new(1, 0, 1, elements[0].position().scale(3.0));
        let summary = CollisionAnalyzer::new(SphereConfig::default()).summarize(&elements);
        assert_eq!(summary.colliding_cells, 1);
        assert_eq!(summary.groups[0].element_ids, vec![0, 1]);
    }

    #[test]
    fn test_meridian_cluster_from_config() {
        let elements = column_layout((0..12).map(|i| 78 + i % 5), 320);
        let analyzer = CollisionAnalyzer::new(SphereConfig::default());
        let clusters = analyzer.meridian_clusters(&elements);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 12);
    }

    #[test]
    fn test_report_collects_everything() {
        let elements = column_layout(74..=85, 320);
        let mut config = west_config([79, 79]);
        config.features.push(FeatureConfig::new("east", 90.0).with_band(76, 80));
        let report = CollisionAnalyzer::new(config).report(&elements);
        assert_eq!(report.summary.element_count, 12);
        assert_eq!(report.features.len(), 2);
        assert_eq!(report.band_overlaps.len(), 1);
        assert!(!report.all_covered());
    }

    #[test]
    fn test_compare_strategies_uses_config_bound() {
        let elements = column_layout(0..320, 320);
        let mut config = SphereConfig::default();
        config.projection.approximation_bound = 0.02;
        let report = CollisionAnalyzer::new(config).compare_strategies(&elements);
        assert_eq!(report.bound, 0.02);
        assert!(report.within_bound());
        assert_eq!(report.element_count, 320);
        assert_eq!(report.resolution, Resolution::default());
    }
}
