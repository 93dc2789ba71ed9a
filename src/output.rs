//! PNG, JSON and CSV output

use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::engine::StripBuffer;
use crate::frame::TextureFrame;
use crate::models::{Color, Element, ProjectionResult};
use crate::quantize::{quantize_result, Resolution};

/// Error type for output operations
#[derive(Debug)]
pub enum OutputError {
    /// IO error during file operations
    Io(io::Error),
    /// Image encoding error
    Image(image::ImageError),
    /// JSON serialization error
    Json(serde_json::Error),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Io(e) => write!(f, "IO error: {}", e),
            OutputError::Image(e) => write!(f, "Image error: {}", e),
            OutputError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Io(e) => Some(e),
            OutputError::Image(e) => Some(e),
            OutputError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::Io(e)
    }
}

impl From<image::ImageError> for OutputError {
    fn from(e: image::ImageError) -> Self {
        OutputError::Image(e)
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(e: serde_json::Error) -> Self {
        OutputError::Json(e)
    }
}

fn create_parent_dirs(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Save a frame to a PNG file, creating parent directories as needed.
pub fn save_png(frame: &TextureFrame, path: &Path) -> Result<(), OutputError> {
    create_parent_dirs(path)?;
    frame.as_image().save(path)?;
    Ok(())
}

/// Write `contents` to `path`, or to stdout when no path is given.
pub fn write_output(path: Option<&Path>, contents: &str) -> Result<(), OutputError> {
    match path {
        Some(path) => {
            create_parent_dirs(path)?;
            std::fs::write(path, contents)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            if !contents.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// One element's projection and cell, as written by `sphm project`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionRow {
    pub element_id: u32,
    pub strip_id: u32,
    pub strip_index: u32,
    pub u: f64,
    pub v: f64,
    pub px: u32,
    pub py: u32,
}

/// Join elements with their (index-aligned) projection results.
pub fn projection_rows(
    elements: &[Element],
    results: &[ProjectionResult],
    resolution: Resolution,
) -> Vec<ProjectionRow> {
    elements
        .iter()
        .zip(results)
        .map(|(element, result)| {
            let address = quantize_result(result, resolution);
            ProjectionRow {
                element_id: element.id,
                strip_id: element.strip_id,
                strip_index: element.strip_index,
                u: result.u,
                v: result.v,
                px: address.px,
                py: address.py,
            }
        })
        .collect()
}

pub fn projection_rows_csv(rows: &[ProjectionRow]) -> String {
    let mut output = String::from("element_id,strip_id,strip_index,u,v,px,py\n");
    for row in rows {
        output.push_str(&format!(
            "{},{},{},{:.6},{:.6},{},{}\n",
            row.element_id, row.strip_id, row.strip_index, row.u, row.v, row.px, row.py
        ));
    }
    output
}

pub fn projection_rows_text(rows: &[ProjectionRow]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:>6} {:>5} {:>5} {:>9} {:>9} {:>5} {:>5}\n",
        "id", "strip", "index", "u", "v", "px", "py"
    ));
    for row in rows {
        output.push_str(&format!(
            "{:>6} {:>5} {:>5} {:>9.6} {:>9.6} {:>5} {:>5}\n",
            row.element_id, row.strip_id, row.strip_index, row.u, row.v, row.px, row.py
        ));
    }
    output
}

/// The color computed for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ElementColor {
    pub element_id: u32,
    pub strip_id: u32,
    pub strip_index: u32,
    pub rgb: [u8; 3],
}

pub fn element_colors(elements: &[Element], colors: &[Color]) -> Vec<ElementColor> {
    elements
        .iter()
        .zip(colors)
        .map(|(element, color)| ElementColor {
            element_id: element.id,
            strip_id: element.strip_id,
            strip_index: element.strip_index,
            rgb: color.0,
        })
        .collect()
}

pub fn element_colors_csv(colors: &[ElementColor]) -> String {
    let mut output = String::from("element_id,strip_id,strip_index,r,g,b\n");
    for c in colors {
        output.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.element_id, c.strip_id, c.strip_index, c.rgb[0], c.rgb[1], c.rgb[2]
        ));
    }
    output
}

#[derive(Serialize)]
struct StripJson {
    strip_id: u32,
    colors: Vec<[u8; 3]>,
}

/// Strip buffers as a JSON array of `{strip_id, colors: [[r, g, b], ...]}`.
pub fn strip_buffers_json(buffers: &[StripBuffer]) -> Result<String, OutputError> {
    let strips: Vec<StripJson> = buffers
        .iter()
        .map(|buffer| StripJson {
            strip_id: buffer.strip_id,
            colors: buffer.colors.iter().map(|c| c.0).collect(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&strips)?)
}
