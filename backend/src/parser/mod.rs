//! Load sheet grids from exported files.
//!
//! A Context or Epics sheet exported as CSV (any common encoding, `;`, `,`,
//! tab or `|` delimited) or as a JSON array of rows becomes a [`Grid`].
//! CSV cells are always text; typing them is left to coercion.

use serde_json::Value;
use std::path::Path;

use crate::error::{GridError, GridResult};
use crate::models::Grid;

/// Result of loading a grid, with detection metadata
#[derive(Debug, Clone)]
pub struct ParsedGrid {
    /// All rows, header included
    pub grid: Grid,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected delimiter (`None` for JSON input)
    pub delimiter: Option<char>,
}

impl ParsedGrid {
    /// Header row, if any
    pub fn headers(&self) -> &[Value] {
        self.grid.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last row number in sheet terms (1-based, header included)
    pub fn last_row(&self) -> usize {
        self.grid.len()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = ',';
    let mut best_count = 0;

    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }

    best
}

/// Parse CSV text into a grid with an explicit delimiter.
///
/// Rows keep their own length; quoted fields may contain delimiters and
/// newlines.
pub fn parse_csv_grid(content: &str, delimiter: char) -> GridResult<Grid> {
    let delimiter = u8::try_from(delimiter).map_err(|_| GridError::Csv {
        line: 1,
        message: format!("delimiter '{}' is not a single byte", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Grid::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| GridError::Csv {
            line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 1),
            message: e.to_string(),
        })?;
        grid.push(record.iter().map(|cell| Value::String(cell.to_string())).collect());
    }

    if grid.is_empty() {
        return Err(GridError::Empty);
    }
    Ok(grid)
}

/// Parse a JSON array of rows into a grid.
pub fn parse_json_grid(content: &str) -> GridResult<Grid> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| GridError::InvalidJson(e.to_string()))?;
    grid_from_value(value)
}

/// Convert an already-parsed JSON value into a grid.
pub fn grid_from_value(value: Value) -> GridResult<Grid> {
    let Value::Array(rows) = value else {
        return Err(GridError::InvalidJson("expected an array of rows".to_string()));
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Array(cells) => Ok(cells),
            _ => Err(GridError::InvalidJson(format!("row {} is not an array", i + 1))),
        })
        .collect()
}

/// Parse raw bytes, auto-detecting JSON vs CSV, encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> GridResult<ParsedGrid> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let content = content.trim_start_matches('\u{feff}');

    if content.trim().is_empty() {
        return Err(GridError::Empty);
    }

    if content.trim_start().starts_with('[') {
        return Ok(ParsedGrid { grid: parse_json_grid(content)?, encoding, delimiter: None });
    }

    let delimiter = detect_delimiter(content);
    Ok(ParsedGrid {
        grid: parse_csv_grid(content, delimiter)?,
        encoding,
        delimiter: Some(delimiter),
    })
}

/// Load a grid file with auto-detection.
pub fn parse_grid_file<P: AsRef<Path>>(path: P) -> GridResult<ParsedGrid> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}
