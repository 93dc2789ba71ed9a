//! Diagnostic report rendering

use serde::Serialize;

use super::collisions::{CollisionSummary, MeridianCluster};
use super::coverage::{BandOverlap, FeatureCoverage};
use super::differential::DifferentialReport;

/// Everything the analyzer knows about one layout and configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticReport {
    pub summary: CollisionSummary,
    pub clusters: Vec<MeridianCluster>,
    pub features: Vec<FeatureCoverage>,
    pub band_overlaps: Vec<BandOverlap>,
}

impl DiagnosticReport {
    /// True when every feature band reaches all of its elements.
    pub fn all_covered(&self) -> bool {
        self.features.iter().all(FeatureCoverage::is_covered)
    }
}

/// Serialize any report as pretty-printed JSON.
pub fn to_json<T: Serialize>(report: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Format the diagnostic report as text.
pub fn format_report_text(report: &DiagnosticReport) -> String {
    let mut output = String::new();
    let summary = &report.summary;

    output.push_str("Sphere Collision Report\n");
    output.push_str("=======================\n");
    output.push_str(&format!("Resolution: {}\n", summary.resolution));
    output.push_str(&format!("Strategy: {}\n", summary.strategy));
    output.push_str(&format!("Elements: {}\n", summary.element_count));
    output.push_str(&format!("Occupied cells: {}\n", summary.occupied_cells));
    output.push('\n');

    output.push_str("COLLISIONS\n");
    output.push_str("──────────\n");
    output.push_str(&format!(
        "  Colliding cells:     {:>6}  ({:.1}% of occupied, {:.3}% of texture)\n",
        summary.colliding_cells, summary.percent_cells_affected, summary.percent_texture_affected
    ));
    output.push_str(&format!(
        "  Colliding elements:  {:>6}  ({:.1}%)\n",
        summary.colliding_elements, summary.percent_elements_affected
    ));
    if summary.has_collisions() {
        output.push_str(&format!("  Largest group:       {:>6}\n", summary.largest_group));
        let mut largest: Vec<_> = summary.groups.iter().collect();
        largest.sort_by(|a, b| b.element_ids.len().cmp(&a.element_ids.len()));
        for group in largest.iter().take(10) {
            output.push_str(&format!("  {:<12} {}\n", group.address.to_string(), join_ids(&group.element_ids)));
        }
        if largest.len() > 10 {
            output.push_str(&format!("  ... +{} more\n", largest.len() - 10));
        }
    }
    output.push('\n');

    if !report.clusters.is_empty() {
        output.push_str("MERIDIAN CLUSTERS\n");
        output.push_str("─────────────────\n");
        for cluster in &report.clusters {
            output.push_str(&format!(
                "  X{:03}..X{:03}  {:>3} elements around column {}\n",
                cluster.start_px,
                cluster.end_px,
                cluster.len(),
                cluster.center_px
            ));
        }
        output.push('\n');
    }

    if !report.features.is_empty() {
        output.push_str("FEATURE COVERAGE\n");
        output.push_str("────────────────\n");
        for feature in &report.features {
            output.push_str(&format_feature(feature));
        }
        output.push('\n');
    }

    if !report.band_overlaps.is_empty() {
        output.push_str("BAND OVERLAPS\n");
        output.push_str("─────────────\n");
        for overlap in &report.band_overlaps {
            output.push_str(&format!(
                "  {} / {}: {} shared column(s)\n",
                overlap.first,
                overlap.second,
                overlap.columns.len()
            ));
        }
        output.push('\n');
    }

    output
}

fn format_feature(feature: &FeatureCoverage) -> String {
    let status = if feature.is_covered() { "ok" } else { "STARVED" };
    let mut output = format!(
        "  {} ({:.1}° ±{:.1}°): {}\n",
        feature.name, feature.longitude_deg, feature.tolerance_deg, status
    );
    output.push_str(&format!(
        "    Painted band:      {} ({} px)\n",
        feature.painted,
        feature.painted_width()
    ));
    output.push_str(&format!("    Members:           {}\n", feature.members.len()));
    match feature.recommended_band() {
        Some(band) => output.push_str(&format!(
            "    Recommended band:  {} ({} px)\n",
            band,
            feature.recommended_width()
        )),
        None => output.push_str("    Recommended band:  none (no members)\n"),
    }
    if !feature.is_covered() {
        output.push_str(&format!(
            "    Starved:           {} ({})\n",
            feature.starved.len(),
            join_ids(&feature.starved)
        ));
    }
    output
}

/// Format a strategy comparison as text.
pub fn format_differential_text(report: &DifferentialReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("Strategy Comparison ({} vs {})\n", report.candidate, report.reference));
    output.push_str("==============================\n");
    output.push_str(&format!("Elements: {}\n", report.element_count));
    output.push_str(&format!("Bound: {}\n", report.bound));
    output.push('\n');
    output.push_str(&format!("  Max U diff:   {:.6}\n", report.max_du));
    output.push_str(&format!("  Max V diff:   {:.6}\n", report.max_dv));
    output.push_str(&format!("  Mean U diff:  {:.6}\n", report.mean_du));
    output.push_str(&format!("  Mean V diff:  {:.6}\n", report.mean_dv));
    output.push_str(&format!(
        "  Pixel mismatches at {}: {}\n",
        report.resolution, report.pixel_mismatches
    ));
    output.push('\n');

    if report.within_bound() {
        output.push_str("All elements within bound\n");
    } else {
        output.push_str(&format!("VIOLATIONS ({})\n", report.violations.len()));
        output.push_str("──────────\n");
        for d in &report.violations {
            output.push_str(&format!(
                "  {:>6}  u {:.4} -> {:.4}  v {:.4} -> {:.4}  (du {:.4}, dv {:.4})\n",
                d.element_id, d.reference.u, d.candidate.u, d.reference.v, d.candidate.v, d.du, d.dv
            ));
        }
    }
    output
}

fn join_ids(ids: &[u32]) -> String {
    const PREVIEW: usize = 8;
    let shown: Vec<String> = ids.iter().take(PREVIEW).map(u32::to_string).collect();
    if ids.len() > PREVIEW {
        format!("{}, ... +{} more", shown.join(", "), ids.len() - PREVIEW)
    } else {
        shown.join(", ")
    }
}
