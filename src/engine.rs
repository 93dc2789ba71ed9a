//! Per-tick color computation
//!
//! [`SphereEngine`] owns the immutable elements, projects them once, and
//! keeps the quantized pixel addresses for the most recent frame
//! resolution. A frame of any other size forces the addresses to be
//! rebuilt; stale addresses are never reused.

use rayon::prelude::*;

use crate::config::SphereConfig;
use crate::frame::TextureFrame;
use crate::geometry::Orientation;
use crate::layout::LayoutRegistry;
use crate::models::{Color, Element, PixelAddress, ProjectionResult};
use crate::projection::{Projection, ProjectionStrategy, Uv};
use crate::quantize::{quantize, Resolution};
use crate::sampler::{sample, sample_all};

/// Colors of one physical strip, ordered by strip index.
#[derive(Debug, Clone, PartialEq)]
pub struct StripBuffer {
    pub strip_id: u32,
    pub colors: Vec<Color>,
}

#[derive(Debug)]
struct AddressCache {
    resolution: Resolution,
    addresses: Vec<PixelAddress>,
}

/// Cached projection pipeline for one layout.
#[derive(Debug)]
pub struct SphereEngine {
    elements: Vec<Element>,
    config: SphereConfig,
    orientation: Orientation,
    projection: Box<dyn Projection>,
    projections: Vec<ProjectionResult>,
    addresses: Option<AddressCache>,
}

impl SphereEngine {
    pub fn new(elements: Vec<Element>, config: SphereConfig) -> Self {
        let orientation = unit_orientation(config.projection.orientation);
        let projection = config.projection.strategy.build(&config.projection);
        let mut engine = Self {
            elements,
            config,
            orientation,
            projection,
            projections: Vec::new(),
            addresses: None,
        };
        engine.rebuild_projections();
        engine
    }

    pub fn from_registry(registry: &LayoutRegistry, config: SphereConfig) -> Self {
        Self::new(registry.elements().to_vec(), config)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn config(&self) -> &SphereConfig {
        &self.config
    }

    pub fn strategy(&self) -> ProjectionStrategy {
        self.projection.strategy()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Cached projection results, index-aligned with [`elements`](Self::elements).
    pub fn projections(&self) -> &[ProjectionResult] {
        &self.projections
    }

    /// Resolution the address cache was built for, if any.
    pub fn cached_resolution(&self) -> Option<Resolution> {
        self.addresses.as_ref().map(|cache| cache.resolution)
    }

    /// Switch projection strategy. Projections are rebuilt and addresses dropped.
    pub fn set_strategy(&mut self, strategy: ProjectionStrategy) {
        if strategy == self.strategy() {
            return;
        }
        self.config.projection.strategy = strategy;
        self.projection = strategy.build(&self.config.projection);
        self.rebuild_projections();
    }

    /// Change the sphere attitude. Projections are rebuilt and addresses dropped.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        let orientation = unit_orientation(orientation);
        if orientation == self.orientation {
            return;
        }
        self.config.projection.orientation = orientation;
        self.orientation = orientation;
        self.rebuild_projections();
    }

    fn rebuild_projections(&mut self) {
        let projection = self.projection.as_ref();
        let orientation = self.orientation;
        let project = |element: &Element| {
            let Uv { u, v } = projection.project(orientation.rotate(element.position()));
            ProjectionResult { element_id: element.id, u, v }
        };

        self.projections = if self.config.engine.parallel {
            self.elements.par_iter().map(project).collect()
        } else {
            self.elements.iter().map(project).collect()
        };
        self.addresses = None;

        log::debug!(
            "projected {} element(s) with {} strategy",
            self.projections.len(),
            self.projection.strategy()
        );
    }

    /// Pixel addresses for `resolution`, recomputing them if the cache was
    /// built for a different one.
    pub fn addresses(&mut self, resolution: Resolution) -> &[PixelAddress] {
        let stale = self.cached_resolution() != Some(resolution);
        if stale {
            if let Some(previous) = self.cached_resolution() {
                log::debug!("frame resolution changed {} -> {}, recomputing addresses", previous, resolution);
            }
            let addresses = self
                .projections
                .iter()
                .map(|r| quantize(Uv { u: r.u, v: r.v }, resolution))
                .collect();
            self.addresses = Some(AddressCache { resolution, addresses });
        }

        match &self.addresses {
            Some(cache) => &cache.addresses,
            None => &[],
        }
    }

    /// One color per element, index-aligned with [`elements`](Self::elements).
    ///
    /// Never fails: degenerate elements sample the texture center and
    /// out-of-range addresses are clamped.
    pub fn compute_colors(&mut self, frame: &TextureFrame) -> Vec<Color> {
        let parallel = self.config.engine.parallel;
        let addresses = self.addresses(frame.resolution());
        if parallel {
            addresses.par_iter().map(|&address| sample(frame, address)).collect()
        } else {
            sample_all(frame, addresses)
        }
    }

    /// Colors for `frame` regrouped per strip.
    pub fn strip_buffers(&mut self, frame: &TextureFrame) -> Vec<StripBuffer> {
        let colors = self.compute_colors(frame);
        strip_buffers(&self.elements, &colors)
    }
}

fn unit_orientation(orientation: Orientation) -> Orientation {
    orientation.normalized().unwrap_or_else(|| {
        log::warn!("zero-length orientation, using identity");
        Orientation::IDENTITY
    })
}

/// Compute colors for `elements` against `frame` without keeping a cache.
///
/// Output is index-aligned with `elements`.
pub fn compute_colors(elements: &[Element], frame: &TextureFrame, config: &SphereConfig) -> Vec<Color> {
    SphereEngine::new(elements.to_vec(), config.clone()).compute_colors(frame)
}

/// Regroup an index-aligned color array per strip.
///
/// Strips are ordered by id and each strip's colors by strip index.
pub fn strip_buffers(elements: &[Element], colors: &[Color]) -> Vec<StripBuffer> {
    let mut order: Vec<(u32, u32, Color)> = elements
        .iter()
        .zip(colors)
        .map(|(element, &color)| (element.strip_id, element.strip_index, color))
        .collect();
    order.sort_by_key(|&(strip_id, strip_index, _)| (strip_id, strip_index));

    let mut buffers: Vec<StripBuffer> = Vec::new();
    for (strip_id, _, color) in order {
        match buffers.last_mut() {
            Some(buffer) if buffer.strip_id == strip_id => buffer.colors.push(color),
            _ => buffers.push(StripBuffer { strip_id, colors: vec![color] }),
        }
    }
    buffers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;
    use image::Rgb;
    use std::f64::consts::FRAC_PI_2;

    fn axes() -> Vec<Element> {
        vec![
            Element::new(0, 0, 1, Vec3::new(0.0, 0.0, -1.0)),
            Element::new(1, 0, 0, Vec3::new(1.0, 0.0, 0.0)),
            Element::new(2, 1, 0, Vec3::ZERO),
        ]
    }

    fn marked_frame(resolution: Resolution) -> TextureFrame {
        let mut frame = TextureFrame::new(resolution);
        for px in 0..resolution.width {
            for py in 0..resolution.height {
                frame.set(px, py, Rgb([(px % 256) as u8, (py % 256) as u8, 1]));
            }
        }
        frame
    }

    fn exact_config(parallel: bool) -> SphereConfig {
        let mut config = SphereConfig::default();
        config.projection.strategy = ProjectionStrategy::Exact;
        config.engine.parallel = parallel;
        config
    }

    #[test]
    fn test_compute_colors_index_aligned() {
        let mut engine = SphereEngine::new(axes(), exact_config(false));
        let colors = engine.compute_colors(&marked_frame(Resolution::new(320, 160)));
        assert_eq!(colors.len(), 3);
        assert_eq!(colors[0], Rgb([80, 80, 1]));
        assert_eq!(colors[1], Rgb([160, 80, 1]));
        // degenerate element samples the center cell
        assert_eq!(colors[2], Rgb([160, 80, 1]));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let frame = marked_frame(Resolution::new(64, 32));
        let mut sequential = SphereEngine::new(axes(), exact_config(false));
        let mut parallel = SphereEngine::new(axes(), exact_config(true));
        assert_eq!(sequential.compute_colors(&frame), parallel.compute_colors(&frame));
    }

    #[test]
    fn test_compute_colors_idempotent() {
        let frame = marked_frame(Resolution::new(320, 160));
        let mut engine = SphereEngine::new(axes(), SphereConfig::default());
        let first = engine.compute_colors(&frame);
        let second = engine.compute_colors(&frame);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolution_change_recomputes_addresses() {
        let mut engine = SphereEngine::new(axes(), exact_config(false));
        assert_eq!(engine.cached_resolution(), None);

        engine.compute_colors(&marked_frame(Resolution::new(320, 160)));
        assert_eq!(engine.cached_resolution(), Some(Resolution::new(320, 160)));
        assert_eq!(engine.addresses(Resolution::new(320, 160))[0], PixelAddress::new(80, 80));

        let colors = engine.compute_colors(&marked_frame(Resolution::new(40, 20)));
        assert_eq!(engine.cached_resolution(), Some(Resolution::new(40, 20)));
        assert_eq!(colors[0], Rgb([10, 10, 1]));
    }

    #[test]
    fn test_set_strategy_drops_cache() {
        let mut engine = SphereEngine::new(axes(), exact_config(false));
        engine.addresses(Resolution::new(320, 160));
        engine.set_strategy(ProjectionStrategy::Fast);
        assert_eq!(engine.strategy(), ProjectionStrategy::Fast);
        assert_eq!(engine.config().projection.strategy, ProjectionStrategy::Fast);
        assert_eq!(engine.cached_resolution(), None);
    }

    #[test]
    fn test_set_orientation_reprojects() {
        let mut engine = SphereEngine::new(axes(), exact_config(false));
        engine.addresses(Resolution::new(320, 160));
        engine.set_orientation(Orientation::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), FRAC_PI_2));
        assert_eq!(engine.cached_resolution(), None);
        // +x rotated onto -z
        assert!((engine.projections()[1].u - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_orientation_falls_back_to_identity() {
        let mut config = exact_config(false);
        config.projection.orientation = Orientation::from([0.0, 0.0, 0.0, 0.0]);
        let engine = SphereEngine::new(axes(), config);
        assert!(engine.orientation().is_identity());
    }

    #[test]
    fn test_stateless_compute_colors() {
        let frame = marked_frame(Resolution::new(320, 160));
        let colors = compute_colors(&axes(), &frame, &exact_config(true));
        assert_eq!(colors[1], Rgb([160, 80, 1]));
    }

    #[test]
    fn test_strip_buffers_grouped_and_ordered() {
        let elements = axes();
        let colors = vec![Rgb([1, 0, 0]), Rgb([2, 0, 0]), Rgb([3, 0, 0])];
        let buffers = strip_buffers(&elements, &colors);
        assert_eq!(
            buffers,
            vec![
                StripBuffer { strip_id: 0, colors: vec![Rgb([2, 0, 0]), Rgb([1, 0, 0])] },
                StripBuffer { strip_id: 1, colors: vec![Rgb([3, 0, 0])] },
            ]
        );
    }

    #[test]
    fn test_empty_layout() {
        let mut engine = SphereEngine::new(Vec::new(), SphereConfig::default());
        assert!(engine.compute_colors(&marked_frame(Resolution::new(8, 4))).is_empty());
    }
}
