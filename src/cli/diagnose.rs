//! Diagnostic command implementations (collisions, coverage, compare)

use std::path::Path;
use std::process::ExitCode;

use crate::analyze::{
    format_differential_text, format_report_text, to_json, CollisionAnalyzer, DiagnosticReport,
};
use crate::config::{FeatureConfig, SphereConfig};

use super::{
    emit, finish, load_registry, require_valid, resolve_config, Format, TextureArgs,
    EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS,
};

/// Name given to a feature described on the command line.
const AD_HOC_FEATURE: &str = "cli";

/// A feature passed with `--longitude` instead of taken from the config.
#[derive(Debug, Clone)]
pub struct AdHocFeature {
    pub longitude: f64,
    pub band: Option<String>,
    pub tolerance: Option<f64>,
}

/// Parse a `START:END` column band.
pub(crate) fn parse_band(s: &str) -> Result<[u32; 2], String> {
    let (start, end) =
        s.split_once(':').ok_or_else(|| format!("Invalid band '{}': expected START:END", s))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid band '{}': '{}' is not a column index", s, part))
    };
    Ok([parse(start)?, parse(end)?])
}

fn require_text_or_json(format: Format) -> Result<(), ExitCode> {
    if format == Format::Csv {
        eprintln!("Error: --format must be 'text' or 'json'");
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }
    Ok(())
}

fn render<T: serde::Serialize>(
    format: Format,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<String, ExitCode> {
    match format {
        Format::Json => to_json(value).map_err(|e| {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }),
        _ => Ok(text(value)),
    }
}

/// Execute the collisions command
pub fn run_collisions(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    format: Format,
    output: Option<&Path>,
) -> ExitCode {
    finish(collisions(config_path, layout, texture, format, output))
}

fn collisions(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    format: Format,
    output: Option<&Path>,
) -> Result<ExitCode, ExitCode> {
    require_text_or_json(format)?;
    let config = resolve_config(config_path, &texture.overrides())?;
    let registry = load_registry(layout)?;
    let analyzer = CollisionAnalyzer::new(config);

    let elements = registry.elements();
    let report = DiagnosticReport {
        summary: analyzer.summarize(elements),
        clusters: analyzer.meridian_clusters(elements),
        features: Vec::new(),
        band_overlaps: Vec::new(),
    };
    let contents = render(format, &report, format_report_text)?;
    emit(output, &contents)?;
    Ok(ExitCode::from(EXIT_SUCCESS))
}

/// Pick the features to check: the ad-hoc one, the named ones, or all.
fn select_features(
    config: &SphereConfig,
    names: &[String],
    ad_hoc: Option<AdHocFeature>,
) -> Result<Vec<FeatureConfig>, ExitCode> {
    let mut selected = Vec::new();

    if let Some(ad_hoc) = ad_hoc {
        let mut feature = FeatureConfig::new(AD_HOC_FEATURE, ad_hoc.longitude);
        feature.tolerance_deg = ad_hoc.tolerance;
        if let Some(band) = ad_hoc.band.as_deref() {
            let [start, end] = parse_band(band).map_err(|e| {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_INVALID_ARGS)
            })?;
            feature = feature.with_band(start, end);
        }
        selected.push(feature);
    }

    for name in names {
        match config.feature(name) {
            Some(feature) => selected.push(feature.clone()),
            None => {
                eprintln!("Error: No feature named '{}' in configuration", name);
                return Err(ExitCode::from(EXIT_INVALID_ARGS));
            }
        }
    }

    if selected.is_empty() && names.is_empty() {
        selected = config.features.clone();
    }
    Ok(selected)
}

/// Execute the coverage command
pub fn run_coverage(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    names: &[String],
    ad_hoc: Option<AdHocFeature>,
    format: Format,
    output: Option<&Path>,
) -> ExitCode {
    finish(coverage(config_path, layout, texture, names, ad_hoc, format, output))
}

fn coverage(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    names: &[String],
    ad_hoc: Option<AdHocFeature>,
    format: Format,
    output: Option<&Path>,
) -> Result<ExitCode, ExitCode> {
    require_text_or_json(format)?;
    let mut config = resolve_config(config_path, &texture.overrides())?;
    let features = select_features(&config, names, ad_hoc)?;
    if features.is_empty() {
        eprintln!("Error: No features to check (configure [[features]] or pass --longitude)");
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }

    // Ad-hoc features go through the same validation as configured ones
    config.features = features;
    require_valid(config.validate())?;

    let registry = load_registry(layout)?;
    let report = CollisionAnalyzer::new(config).report(registry.elements());
    let contents = render(format, &report, format_report_text)?;
    emit(output, &contents)?;

    if report.all_covered() {
        Ok(ExitCode::from(EXIT_SUCCESS))
    } else {
        Ok(ExitCode::from(EXIT_ERROR))
    }
}

/// Execute the compare command
pub fn run_compare(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    format: Format,
    output: Option<&Path>,
) -> ExitCode {
    finish(compare(config_path, layout, texture, format, output))
}

fn compare(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    format: Format,
    output: Option<&Path>,
) -> Result<ExitCode, ExitCode> {
    require_text_or_json(format)?;
    let config = resolve_config(config_path, &texture.overrides())?;
    let registry = load_registry(layout)?;

    let report = CollisionAnalyzer::new(config).compare_strategies(registry.elements());
    let contents = render(format, &report, format_differential_text)?;
    emit(output, &contents)?;

    if report.within_bound() {
        Ok(ExitCode::from(EXIT_SUCCESS))
    } else {
        Ok(ExitCode::from(EXIT_ERROR))
    }
}
