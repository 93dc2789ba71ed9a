//! Loading of sphere layouts from tabular (CSV) descriptions
//!
//! Producers write columns in varying order and with varying names, so
//! every column is resolved by name against a list of aliases:
//!
//! | Column | Accepted headers (case-insensitive) |
//! |--------|-------------------------------------|
//! | id | `FaceID`, `id`, `led_id`, `element_id` |
//! | strip | `strip`, `strip_id` |
//! | strip index | `strip_num`, `strip_index`, `index_in_strip` |
//! | position | `x`, `y`, `z` |
//!
//! A missing column is fatal. A malformed row is skipped with a warning
//! and loading continues.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

use crate::geometry::Vec3;
use crate::models::{Element, Warning};

/// Fatal layout loading errors
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The source could not be read
    #[error("failed to read layout: {0}")]
    Io(#[from] std::io::Error),
    /// No header row was found
    #[error("layout has no header row")]
    MissingHeader,
    /// Required columns are absent from the header
    #[error("layout is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Elements loaded from a layout, plus the rows that were skipped.
#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    pub elements: Vec<Element>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Strip,
    StripIndex,
    X,
    Y,
    Z,
}

impl Column {
    const ALL: [Column; 6] =
        [Column::Id, Column::Strip, Column::StripIndex, Column::X, Column::Y, Column::Z];

    fn name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Strip => "strip",
            Column::StripIndex => "strip_index",
            Column::X => "x",
            Column::Y => "y",
            Column::Z => "z",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Id => &["faceid", "id", "led_id", "element_id"],
            Column::Strip => &["strip", "strip_id"],
            Column::StripIndex => &["strip_num", "strip_index", "index_in_strip"],
            Column::X => &["x"],
            Column::Y => &["y"],
            Column::Z => &["z"],
        }
    }
}

/// Header position of each required column.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    indices: [usize; 6],
    field_count: usize,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Result<Self, LayoutError> {
        let normalized: Vec<String> = header.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let mut indices = [0usize; 6];
        let mut missing = Vec::new();

        for (slot, column) in Column::ALL.iter().enumerate() {
            match normalized.iter().position(|h| column.aliases().contains(&h.as_str())) {
                Some(index) => indices[slot] = index,
                None => missing.push(column.name().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(LayoutError::MissingColumns(missing));
        }
        Ok(Self { indices, field_count: header.len() })
    }

    fn get<'a>(&self, fields: &'a [String], column: Column) -> &'a str {
        fields[self.indices[column as usize]].as_str()
    }
}

/// Split one CSV line into trimmed fields, honoring double quotes.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse a non-negative integer, accepting float spellings such as `"3.0"`.
fn parse_index(field: &str) -> Option<u32> {
    if let Ok(value) = field.parse::<u32>() {
        return Some(value);
    }
    let value = field.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn parse_coordinate(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_row(fields: &[String], columns: &ColumnMap) -> Result<Element, String> {
    if fields.len() != columns.field_count {
        return Err(format!(
            "expected {} fields, found {}",
            columns.field_count,
            fields.len()
        ));
    }

    let index = |column: Column| {
        let raw = columns.get(fields, column);
        parse_index(raw).ok_or_else(|| {
            format!("column '{}': '{}' is not a non-negative integer", column.name(), raw)
        })
    };
    let coordinate = |column: Column| {
        let raw = columns.get(fields, column);
        parse_coordinate(raw)
            .ok_or_else(|| format!("column '{}': '{}' is not a finite number", column.name(), raw))
    };

    let id = index(Column::Id)?;
    let strip_id = index(Column::Strip)?;
    let strip_index = index(Column::StripIndex)?;
    let position = Vec3::new(coordinate(Column::X)?, coordinate(Column::Y)?, coordinate(Column::Z)?);

    Ok(Element::new(id, strip_id, strip_index, position))
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Drop the `\r` left by CRLF line endings.
fn strip_carriage_return(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    bytes
}

/// Load a layout from CSV text.
///
/// Rows with the wrong field count, unparsable numbers, invalid UTF-8 or
/// duplicate ids are skipped and recorded as warnings. Zero-length
/// positions are kept (they project to the texture center) and also
/// recorded.
pub fn load_layout<R: Read>(reader: R) -> Result<LayoutResult, LayoutError> {
    let mut lines = BufReader::new(reader).split(b'\n');
    let mut line_number = 0usize;

    let columns = loop {
        let Some(line) = lines.next() else {
            return Err(LayoutError::MissingHeader);
        };
        line_number += 1;
        // Header names are ASCII; stray bytes only make a column unresolvable.
        let line = String::from_utf8_lossy(&strip_carriage_return(line?)).into_owned();
        let line = line.trim_start_matches('\u{feff}');
        if is_skippable(line) {
            continue;
        }
        break ColumnMap::from_header(&split_fields(line))?;
    };

    let mut result = LayoutResult::default();
    let mut seen_ids = HashSet::new();

    let warn = |result: &mut LayoutResult, line: usize, message: String| {
        log::warn!("layout line {}: {}", line, message);
        result.warnings.push(Warning { message, line });
    };

    for line in lines {
        line_number += 1;
        let line = match String::from_utf8(strip_carriage_return(line?)) {
            Ok(line) => line,
            Err(_) => {
                warn(&mut result, line_number, "skipped row: not valid UTF-8".to_string());
                continue;
            }
        };
        if is_skippable(&line) {
            continue;
        }

        let element = match parse_row(&split_fields(&line), &columns) {
            Ok(element) => element,
            Err(message) => {
                warn(&mut result, line_number, format!("skipped row: {}", message));
                continue;
            }
        };

        if !seen_ids.insert(element.id) {
            warn(
                &mut result,
                line_number,
                format!("skipped row: duplicate element id {}", element.id),
            );
            continue;
        }

        if element.is_degenerate() {
            warn(
                &mut result,
                line_number,
                format!("element {} has a zero-length position, using texture center", element.id),
            );
        }

        result.elements.push(element);
    }

    log::info!(
        "loaded {} element(s) from layout ({} warning(s))",
        result.elements.len(),
        result.warnings.len()
    );
    Ok(result)
}

/// Load a layout from a CSV file.
pub fn load_layout_file(path: &Path) -> Result<LayoutResult, LayoutError> {
    let file = File::open(path)?;
    load_layout(file)
}

/// The immutable set of elements making up one sphere.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    elements: Vec<Element>,
    warnings: Vec<Warning>,
    by_id: HashMap<u32, usize>,
}

impl LayoutRegistry {
    /// Build a registry from already-constructed elements.
    ///
    /// Lookup by id resolves to the first element carrying that id.
    pub fn new(elements: Vec<Element>) -> Self {
        Self::with_warnings(elements, Vec::new())
    }

    fn with_warnings(elements: Vec<Element>, warnings: Vec<Warning>) -> Self {
        let mut by_id = HashMap::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            by_id.entry(element.id).or_insert(index);
        }
        Self { elements, warnings, by_id }
    }

    /// Load from CSV text.
    pub fn load<R: Read>(reader: R) -> Result<Self, LayoutError> {
        let result = load_layout(reader)?;
        Ok(Self::with_warnings(result.elements, result.warnings))
    }

    /// Load from a CSV file.
    pub fn open(path: &Path) -> Result<Self, LayoutError> {
        let result = load_layout_file(path)?;
        Ok(Self::with_warnings(result.elements, result.warnings))
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Warnings recorded while loading.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn get(&self, id: u32) -> Option<&Element> {
        self.by_id.get(&id).map(|&index| &self.elements[index])
    }

    /// Distinct strip ids in ascending order.
    pub fn strip_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.elements.iter().map(|e| e.strip_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Elements of one strip ordered by their position along the strip.
    pub fn strip(&self, strip_id: u32) -> Vec<&Element> {
        let mut elements: Vec<&Element> =
            self.elements.iter().filter(|e| e.strip_id == strip_id).collect();
        elements.sort_by_key(|e| e.strip_index);
        elements
    }
}
