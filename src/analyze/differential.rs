//! Differential comparison of two projection strategies

use serde::Serialize;

use crate::geometry::Orientation;
use crate::models::Element;
use crate::projection::{Projection, ProjectionStrategy, Uv};
use crate::quantize::{quantize, Resolution};

/// One element's coordinates under both strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Deviation {
    pub element_id: u32,
    pub reference: Uv,
    pub candidate: Uv,
    pub du: f64,
    pub dv: f64,
}

/// How far a candidate strategy strays from a reference over a layout.
///
/// `du` is measured around the longitude seam, so `u = 0` and `u = 1`
/// (the same meridian) count as equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialReport {
    pub reference: ProjectionStrategy,
    pub candidate: ProjectionStrategy,
    pub resolution: Resolution,
    pub bound: f64,
    pub element_count: usize,
    pub max_du: f64,
    pub max_dv: f64,
    pub mean_du: f64,
    pub mean_dv: f64,
    /// Elements quantizing to a different cell under the two strategies
    pub pixel_mismatches: usize,
    /// Elements with `du >= bound` or `dv >= bound`
    pub violations: Vec<Deviation>,
}

impl DifferentialReport {
    pub fn compare(
        elements: &[Element],
        reference: &dyn Projection,
        candidate: &dyn Projection,
        orientation: &Orientation,
        resolution: Resolution,
        bound: f64,
    ) -> Self {
        let mut report = Self {
            reference: reference.strategy(),
            candidate: candidate.strategy(),
            resolution,
            bound,
            element_count: elements.len(),
            max_du: 0.0,
            max_dv: 0.0,
            mean_du: 0.0,
            mean_dv: 0.0,
            pixel_mismatches: 0,
            violations: Vec::new(),
        };

        let mut total_du = 0.0;
        let mut total_dv = 0.0;
        for element in elements {
            let position = orientation.rotate(element.position());
            let a = reference.project(position);
            let b = candidate.project(position);
            let du = seam_distance(a.u, b.u);
            let dv = (a.v - b.v).abs();

            report.max_du = report.max_du.max(du);
            report.max_dv = report.max_dv.max(dv);
            total_du += du;
            total_dv += dv;

            if quantize(a, resolution) != quantize(b, resolution) {
                report.pixel_mismatches += 1;
            }
            if du >= bound || dv >= bound {
                report.violations.push(Deviation {
                    element_id: element.id,
                    reference: a,
                    candidate: b,
                    du,
                    dv,
                });
            }
        }

        if !elements.is_empty() {
            report.mean_du = total_du / elements.len() as f64;
            report.mean_dv = total_dv / elements.len() as f64;
        }

        log::debug!(
            "{} vs {}: max du {:.6}, max dv {:.6}, {} violation(s)",
            report.reference,
            report.candidate,
            report.max_du,
            report.max_dv,
            report.violations.len()
        );
        report
    }

    /// True when no element deviates by the bound or more.
    pub fn within_bound(&self) -> bool {
        self.violations.is_empty()
    }
}

fn seam_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).abs();
    d.min(1.0 - d)
}
