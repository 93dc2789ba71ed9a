//! Frame command implementations (sample, pattern)

use std::path::Path;
use std::process::ExitCode;

use crate::config::CliOverrides;
use crate::engine::{strip_buffers, SphereEngine};
use crate::frame::{feature_test_pattern, TextureFrame};
use crate::output::{element_colors, element_colors_csv, save_png, strip_buffers_json};

use super::{
    emit, finish, load_registry, require_valid, resolve_config, Format, TextureArgs,
    EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS,
};

/// Execute the sample command
pub fn run_sample(
    config_path: Option<&Path>,
    layout: &Path,
    frame_path: &Path,
    overrides: &CliOverrides,
    strips: bool,
    format: Format,
    output: Option<&Path>,
) -> ExitCode {
    finish(sample(config_path, layout, frame_path, overrides, strips, format, output))
}

fn sample(
    config_path: Option<&Path>,
    layout: &Path,
    frame_path: &Path,
    overrides: &CliOverrides,
    strips: bool,
    format: Format,
    output: Option<&Path>,
) -> Result<ExitCode, ExitCode> {
    match (format, strips) {
        (Format::Text, _) => {
            eprintln!("Error: --format must be 'json' or 'csv'");
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
        (Format::Csv, true) => {
            eprintln!("Error: --strips requires --format json");
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
        _ => {}
    }

    let config = resolve_config(config_path, overrides)?;
    let registry = load_registry(layout)?;
    let frame = TextureFrame::open(frame_path).map_err(|e| {
        eprintln!("Error: Cannot load frame '{}': {}", frame_path.display(), e);
        ExitCode::from(EXIT_INVALID_ARGS)
    })?;
    if frame.resolution() != config.resolution() {
        log::info!(
            "frame {} is {}, configured texture is {}",
            frame_path.display(),
            frame.resolution(),
            config.resolution()
        );
    }

    let mut engine = SphereEngine::from_registry(&registry, config);
    let colors = engine.compute_colors(&frame);

    let contents = if strips {
        strip_buffers_json(&strip_buffers(engine.elements(), &colors))
    } else {
        let colors = element_colors(engine.elements(), &colors);
        match format {
            Format::Csv => Ok(element_colors_csv(&colors)),
            _ => serde_json::to_string_pretty(&colors).map_err(Into::into),
        }
    };
    let contents = contents.map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })?;

    emit(output, &contents)?;
    Ok(ExitCode::from(EXIT_SUCCESS))
}

/// Execute the pattern command
pub fn run_pattern(config_path: Option<&Path>, texture: &TextureArgs, output: &Path) -> ExitCode {
    finish(pattern(config_path, texture, output))
}

fn pattern(
    config_path: Option<&Path>,
    texture: &TextureArgs,
    output: &Path,
) -> Result<ExitCode, ExitCode> {
    let config = resolve_config(config_path, &texture.overrides())?;
    require_valid(config.validate_feature_bands())?;
    if config.features.is_empty() {
        log::warn!("no features configured, pattern will be black");
    }

    let frame = feature_test_pattern(&config);
    save_png(&frame, output).map_err(|e| {
        eprintln!("Error: Cannot write '{}': {}", output.display(), e);
        ExitCode::from(EXIT_ERROR)
    })?;
    eprintln!("Saved: {}", output.display());
    Ok(ExitCode::from(EXIT_SUCCESS))
}
