//! Discovery of per-table extract files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use omop_model::OmopTable;
use tracing::debug;

use crate::error::{IngestError, Result};

/// Lists all CSV files in a directory, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|source| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| IngestError::DirectoryRead {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Match CSV files named after a CDM table (`visit_occurrence.csv`,
/// `MEASUREMENT.csv`, ...). Other files are ignored.
pub fn discover_table_files(dir: &Path) -> Result<BTreeMap<OmopTable, PathBuf>> {
    let mut tables = BTreeMap::new();
    for path in list_csv_files(dir)? {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match stem.parse::<OmopTable>() {
            Ok(table) => {
                tables.entry(table).or_insert(path);
            }
            Err(_) => debug!(file = %path.display(), "skipping file without a table name"),
        }
    }
    Ok(tables)
}
