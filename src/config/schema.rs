//! Configuration schema types for `spheremap.toml`
//!
//! Every tunable of the pipeline (texture size, projection strategy,
//! approximation bound, analysis windows, feature bands) lives in one
//! [`SphereConfig`] that is passed explicitly to each component.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::geometry::Orientation;
use crate::projection::{uv_from_angles, ProjectionStrategy, DEFAULT_RATIONAL_LATITUDE_LIMIT};
use crate::quantize::{quantize, Resolution};

/// Panorama texture dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureConfig {
    /// Texture width in pixels
    #[serde(default = "default_width")]
    pub width: u32,
    /// Texture height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self { width: default_width(), height: default_height() }
    }
}

impl TextureConfig {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

fn default_width() -> u32 {
    320
}

fn default_height() -> u32 {
    160
}

/// Projection settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Strategy used by the engine and the diagnostics
    #[serde(default)]
    pub strategy: ProjectionStrategy,
    /// `|y|` below which the fast strategy uses the rational latitude approximation
    #[serde(default = "default_rational_latitude_limit")]
    pub rational_latitude_limit: f64,
    /// Largest tolerated |Δu| or |Δv| between the two strategies
    #[serde(default = "default_approximation_bound")]
    pub approximation_bound: f64,
    /// Sphere rotation `[w, x, y, z]` applied before projection
    #[serde(default)]
    pub orientation: Orientation,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            strategy: ProjectionStrategy::default(),
            rational_latitude_limit: default_rational_latitude_limit(),
            approximation_bound: default_approximation_bound(),
            orientation: Orientation::IDENTITY,
        }
    }
}

fn default_rational_latitude_limit() -> f64 {
    DEFAULT_RATIONAL_LATITUDE_LIMIT
}

fn default_approximation_bound() -> f64 {
    0.01
}

/// Per-tick engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fan per-element work out across the rayon thread pool
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

fn default_true() -> bool {
    true
}

/// Collision and coverage diagnostics settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Half width (in columns) of the meridian clustering window
    #[serde(default = "default_cluster_half_width")]
    pub cluster_half_width: u32,
    /// Elements inside one window that count as a meridian cluster
    #[serde(default = "default_cluster_threshold")]
    pub cluster_threshold: usize,
    /// Angular membership radius for features without their own tolerance
    #[serde(default = "default_tolerance_deg")]
    pub default_tolerance_deg: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cluster_half_width: default_cluster_half_width(),
            cluster_threshold: default_cluster_threshold(),
            default_tolerance_deg: default_tolerance_deg(),
        }
    }
}

fn default_cluster_half_width() -> u32 {
    2
}

fn default_cluster_threshold() -> usize {
    10
}

fn default_tolerance_deg() -> f64 {
    7.0
}

/// A painted visual feature spanning a contiguous range of columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Unique feature name
    pub name: String,
    /// Nominal longitude in degrees, in `[-180, 180]`
    pub longitude_deg: f64,
    /// Angular membership radius (falls back to `analysis.default_tolerance_deg`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance_deg: Option<f64>,
    /// Painted column range `[start, end]`, inclusive; wraps when `start > end`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<[u32; 2]>,
    /// Paint color for test patterns
    #[serde(default = "default_feature_color")]
    pub color: [u8; 3],
}

fn default_feature_color() -> [u8; 3] {
    [255, 255, 255]
}

impl FeatureConfig {
    pub fn new(name: impl Into<String>, longitude_deg: f64) -> Self {
        Self {
            name: name.into(),
            longitude_deg,
            tolerance_deg: None,
            band: None,
            color: default_feature_color(),
        }
    }

    pub fn with_tolerance(mut self, tolerance_deg: f64) -> Self {
        self.tolerance_deg = Some(tolerance_deg);
        self
    }

    pub fn with_band(mut self, start: u32, end: u32) -> Self {
        self.band = Some([start, end]);
        self
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }

    /// Column of the nominal longitude on the equator.
    pub fn nominal_column(&self, resolution: Resolution) -> u32 {
        quantize(uv_from_angles(self.longitude_deg.to_radians(), 0.0), resolution).px
    }

    /// Painted column range; the nominal column alone when no band is set.
    pub fn painted_columns(&self, resolution: Resolution) -> [u32; 2] {
        self.band.unwrap_or_else(|| {
            let px = self.nominal_column(resolution);
            [px, px]
        })
    }
}

/// Complete `spheremap.toml` configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SphereConfig {
    #[serde(default)]
    pub texture: TextureConfig,
    #[serde(default)]
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub features: Vec<FeatureConfig>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "features.west-ring.band")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spheremap.toml: '{}' {}", self.field, self.message)
    }
}

impl SphereConfig {
    pub fn resolution(&self) -> Resolution {
        self.texture.resolution()
    }

    /// Look up a feature by name.
    pub fn feature(&self, name: &str) -> Option<&FeatureConfig> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = self.validate_settings();
        errors.extend(self.validate_feature_bands());
        errors
    }

    /// Validate everything except the fit of feature bands to the texture.
    ///
    /// Commands that never paint or check features use this after a
    /// resolution override, since bands sized for the configured width
    /// do not matter to them.
    pub fn validate_settings(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigValidationError { field, message: message.to_string() });
        };

        if self.texture.width == 0 {
            push("texture.width".to_string(), "must be a positive integer");
        }
        if self.texture.height == 0 {
            push("texture.height".to_string(), "must be a positive integer");
        }

        let limit = self.projection.rational_latitude_limit;
        if !(limit > 0.0 && limit < 1.0) {
            push("projection.rational_latitude_limit".to_string(), "must be in (0, 1)");
        }
        let bound = self.projection.approximation_bound;
        if !(bound > 0.0 && bound.is_finite()) {
            push("projection.approximation_bound".to_string(), "must be a positive number");
        }
        if self.projection.orientation.normalized().is_none() {
            push("projection.orientation".to_string(), "must be a non-zero quaternion");
        }

        let tolerance = self.analysis.default_tolerance_deg;
        if !(tolerance > 0.0 && tolerance <= 180.0) {
            push("analysis.default_tolerance_deg".to_string(), "must be in (0, 180]");
        }
        if self.analysis.cluster_threshold == 0 {
            push("analysis.cluster_threshold".to_string(), "must be a positive integer");
        }
        if self.texture.width > 0 && self.analysis.cluster_half_width >= self.texture.width / 2 {
            push(
                "analysis.cluster_half_width".to_string(),
                "must be less than half the texture width",
            );
        }

        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.name.is_empty() {
                push("features.name".to_string(), "must be a non-empty string");
                continue;
            }
            if !seen.insert(feature.name.as_str()) {
                push(format!("features.{}", feature.name), "is defined more than once");
            }
            if !(-180.0..=180.0).contains(&feature.longitude_deg) {
                push(
                    format!("features.{}.longitude_deg", feature.name),
                    "must be in [-180, 180]",
                );
            }
            if let Some(t) = feature.tolerance_deg {
                if !(t > 0.0 && t <= 180.0) {
                    push(format!("features.{}.tolerance_deg", feature.name), "must be in (0, 180]");
                }
            }
        }

        errors
    }

    /// Check that every feature band lies inside the texture width.
    pub fn validate_feature_bands(&self) -> Vec<ConfigValidationError> {
        let width = self.texture.width;
        self.features
            .iter()
            .filter(|feature| !feature.name.is_empty())
            .filter(|feature| {
                feature.band.is_some_and(|[start, end]| start >= width || end >= width)
            })
            .map(|feature| ConfigValidationError {
                field: format!("features.{}.band", feature.name),
                message: "columns must be inside the texture width".to_string(),
            })
            .collect()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: SphereConfig = toml::from_str("").unwrap();
        assert_eq!(config.texture.width, 320);
        assert_eq!(config.texture.height, 160);
        assert_eq!(config.projection.strategy, ProjectionStrategy::Fast);
        assert_eq!(config.projection.rational_latitude_limit, 0.42);
        assert_eq!(config.projection.approximation_bound, 0.01);
        assert!(config.projection.orientation.is_identity());
        assert!(config.engine.parallel);
        assert_eq!(config.analysis.cluster_half_width, 2);
        assert!(config.features.is_empty());
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[texture]
width = 640
height = 320

[projection]
strategy = "exact"
rational_latitude_limit = 0.5
approximation_bound = 0.02
orientation = [0.0, 0.0, 1.0, 0.0]

[engine]
parallel = false

[analysis]
cluster_half_width = 3
cluster_threshold = 8
default_tolerance_deg = 5.0

[[features]]
name = "west-ring"
longitude_deg = -90.0
band = [74, 85]
color = [0, 255, 0]

[[features]]
name = "east-ring"
longitude_deg = 90.0
tolerance_deg = 6.0
"#;
        let config: SphereConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.resolution(), Resolution::new(640, 320));
        assert_eq!(config.projection.strategy, ProjectionStrategy::Exact);
        assert_eq!(config.projection.orientation.y, 1.0);
        assert!(!config.engine.parallel);
        assert_eq!(config.analysis.cluster_threshold, 8);
        assert_eq!(config.features.len(), 2);

        let west = config.feature("west-ring").unwrap();
        assert_eq!(west.band, Some([74, 85]));
        assert_eq!(west.color, [0, 255, 0]);
        assert_eq!(west.tolerance_deg, None);

        let east = config.feature("east-ring").unwrap();
        assert_eq!(east.tolerance_deg, Some(6.0));
        assert_eq!(east.color, [255, 255, 255]);
        assert!(config.is_valid());
    }

    #[test]
    fn test_validate_zero_dimensions() {
        let mut config = SphereConfig::default();
        config.texture.width = 0;
        config.texture.height = 0;
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "texture.width");
    }

    #[test]
    fn test_validate_projection_settings() {
        let mut config = SphereConfig::default();
        config.projection.rational_latitude_limit = 1.5;
        config.projection.approximation_bound = 0.0;
        config.projection.orientation = Orientation::from([0.0, 0.0, 0.0, 0.0]);
        let fields: Vec<_> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "projection.rational_latitude_limit",
                "projection.approximation_bound",
                "projection.orientation"
            ]
        );
    }

    #[test]
    fn test_validate_features() {
        let mut config = SphereConfig::default();
        config.features = vec![
            FeatureConfig::new("ring", -90.0).with_band(74, 400),
            FeatureConfig::new("ring", 200.0),
            FeatureConfig::new("", 0.0),
            FeatureConfig::new("narrow", 0.0).with_tolerance(0.0),
        ];
        let fields: Vec<_> = config.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"features.ring.band".to_string()));
        assert!(fields.contains(&"features.ring".to_string()));
        assert!(fields.contains(&"features.ring.longitude_deg".to_string()));
        assert!(fields.contains(&"features.name".to_string()));
        assert!(fields.contains(&"features.narrow.tolerance_deg".to_string()));
    }

    #[test]
    fn test_validate_cluster_half_width() {
        let mut config = SphereConfig::default();
        config.analysis.cluster_half_width = u32::MAX;
        let fields: Vec<_> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["analysis.cluster_half_width"]);

        config.analysis.cluster_half_width = 159;
        assert!(config.is_valid());
        config.analysis.cluster_half_width = 160;
        assert!(!config.is_valid());
    }

    #[test]
    fn test_settings_ignore_band_fit() {
        let mut config = SphereConfig::default();
        config.features = vec![FeatureConfig::new("west", -90.0).with_band(74, 85)];
        config.texture.width = 32;
        assert!(config.validate_settings().is_empty());

        let fields: Vec<_> =
            config.validate_feature_bands().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["features.west.band"]);
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigValidationError {
            field: "texture.width".to_string(),
            message: "must be a positive integer".to_string(),
        };
        assert_eq!(err.to_string(), "spheremap.toml: 'texture.width' must be a positive integer");
    }
}
