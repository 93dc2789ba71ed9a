//! Project command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::engine::SphereEngine;
use crate::output::{projection_rows, projection_rows_csv, projection_rows_text};

use super::{emit, finish, load_registry, resolve_config, Format, TextureArgs, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the project command
pub fn run_project(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    format: Format,
    output: Option<&Path>,
) -> ExitCode {
    finish(project(config_path, layout, texture, format, output))
}

fn project(
    config_path: Option<&Path>,
    layout: &Path,
    texture: &TextureArgs,
    format: Format,
    output: Option<&Path>,
) -> Result<ExitCode, ExitCode> {
    let config = resolve_config(config_path, &texture.overrides())?;
    let registry = load_registry(layout)?;
    let resolution = config.resolution();

    let engine = SphereEngine::from_registry(&registry, config);
    let rows = projection_rows(engine.elements(), engine.projections(), resolution);

    let contents = match format {
        Format::Text => projection_rows_text(&rows),
        Format::Csv => projection_rows_csv(&rows),
        Format::Json => match serde_json::to_string_pretty(&rows) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error: {}", e);
                return Err(ExitCode::from(EXIT_ERROR));
            }
        },
    };
    emit(output, &contents)?;
    Ok(ExitCode::from(EXIT_SUCCESS))
}
