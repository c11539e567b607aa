//! Load CSV extracts into string-typed frames.
//!
//! All columns are read as nullable text; typing happens in the transformer's
//! cleaning stage so that a single bad value never fails the whole load.

use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::{Column, DataFrame, PolarsResult};
use tracing::debug;

use crate::error::{IngestError, Result};

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn normalize_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Build a text frame from headers and row-major cells.
///
/// Short rows are padded with nulls; extra cells are ignored.
pub fn frame_from_rows(
    headers: &[String],
    rows: &[Vec<Option<String>>],
) -> PolarsResult<DataFrame> {
    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let values: Vec<Option<String>> = rows
                .iter()
                .map(|row| row.get(idx).cloned().flatten())
                .collect();
            Column::new(name.as_str().into(), values)
        })
        .collect();
    DataFrame::new(columns)
}

/// Read a comma-delimited extract with a header row.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(normalize_header)
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(IngestError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let row: Vec<Option<String>> = record.iter().map(normalize_cell).collect();
        if row.iter().all(Option::is_none) {
            continue;
        }
        rows.push(row);
    }
    debug!(path = %path.display(), columns = headers.len(), rows = rows.len(), "read extract");
    frame_from_rows(&headers, &rows).map_err(|source| IngestError::Frame {
        path: path.to_path_buf(),
        source,
    })
}
