//! Loaders for OMOP vocabulary exports.
//!
//! Vocabulary downloads ship as tab-delimited files with a `.csv` extension,
//! while locally curated maps are usually comma-delimited; the delimiter is
//! detected from the header line. Rows with a non-empty `invalid_reason` are
//! skipped.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::info;

use crate::error::VocabError;
use crate::records::{Concept, ConceptRelationship, SourceToConcept};
use crate::snapshot::VocabularySnapshot;

type Row = BTreeMap<String, String>;

struct CsvRows {
    path: PathBuf,
    rows: Vec<(u64, Row)>,
}

impl CsvRows {
    fn read(path: &Path, required: &[&str]) -> Result<Self, VocabError> {
        let delimiter = detect_delimiter(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .quoting(delimiter != b'\t')
            .from_path(path)
            .map_err(|source| VocabError::csv(path, source))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| VocabError::csv(path, source))?
            .iter()
            .map(|header| header.trim().trim_matches('\u{feff}').to_lowercase())
            .collect();
        for column in required {
            if !headers.iter().any(|header| header == column) {
                return Err(VocabError::MissingColumn {
                    path: path.to_path_buf(),
                    column: (*column).to_string(),
                });
            }
        }
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| VocabError::csv(path, source))?;
            let line = record.position().map_or(0, csv::Position::line);
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.clone(), value.trim().to_string()))
                .collect();
            let invalid = row.get("invalid_reason").is_some_and(|v| !v.is_empty());
            if !invalid {
                rows.push((line, row));
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    fn text(row: &Row, column: &str) -> String {
        row.get(column).cloned().unwrap_or_default()
    }

    fn optional(row: &Row, column: &str) -> Option<String> {
        row.get(column).filter(|value| !value.is_empty()).cloned()
    }

    fn id(&self, line: u64, row: &Row, column: &str) -> Result<i64, VocabError> {
        let value = Self::text(row, column);
        value.parse::<i64>().map_err(|_| VocabError::InvalidValue {
            path: self.path.clone(),
            line,
            column: column.to_string(),
            value,
        })
    }
}

fn detect_delimiter(path: &Path) -> Result<u8, VocabError> {
    let file = fs::File::open(path).map_err(|source| VocabError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .map_err(|source| VocabError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(if header.contains('\t') { b'\t' } else { b',' })
}

/// Read a CONCEPT table export.
pub fn read_concepts(path: &Path) -> Result<Vec<Concept>, VocabError> {
    let table = CsvRows::read(
        path,
        &[
            "concept_id",
            "concept_name",
            "domain_id",
            "vocabulary_id",
            "concept_code",
        ],
    )?;
    let mut concepts = Vec::with_capacity(table.rows.len());
    for (line, row) in &table.rows {
        concepts.push(Concept {
            concept_id: table.id(*line, row, "concept_id")?,
            concept_name: CsvRows::text(row, "concept_name"),
            domain_id: CsvRows::text(row, "domain_id"),
            vocabulary_id: CsvRows::text(row, "vocabulary_id"),
            concept_code: CsvRows::text(row, "concept_code"),
            standard_concept: CsvRows::optional(row, "standard_concept"),
        });
    }
    Ok(concepts)
}

/// Read a CONCEPT_RELATIONSHIP table export.
pub fn read_concept_relationships(path: &Path) -> Result<Vec<ConceptRelationship>, VocabError> {
    let table = CsvRows::read(path, &["concept_id_1", "concept_id_2", "relationship_id"])?;
    let mut relationships = Vec::with_capacity(table.rows.len());
    for (line, row) in &table.rows {
        relationships.push(ConceptRelationship {
            concept_id_1: table.id(*line, row, "concept_id_1")?,
            concept_id_2: table.id(*line, row, "concept_id_2")?,
            relationship_id: CsvRows::text(row, "relationship_id"),
        });
    }
    Ok(relationships)
}

/// Read a SOURCE_TO_CONCEPT_MAP table export.
pub fn read_source_to_concept_map(path: &Path) -> Result<Vec<SourceToConcept>, VocabError> {
    let table = CsvRows::read(
        path,
        &[
            "source_code",
            "source_vocabulary_id",
            "source_concept_id",
            "target_concept_id",
        ],
    )?;
    let mut rows = Vec::with_capacity(table.rows.len());
    for (line, row) in &table.rows {
        rows.push(SourceToConcept {
            source_code: CsvRows::text(row, "source_code"),
            source_vocabulary_id: CsvRows::text(row, "source_vocabulary_id"),
            source_concept_id: table.id(*line, row, "source_concept_id")?,
            target_concept_id: table.id(*line, row, "target_concept_id")?,
        });
    }
    Ok(rows)
}

/// Find `<stem>.csv` (or `.tsv`) in `dir`, ignoring case.
fn find_table_file(dir: &Path, stem: &str) -> Result<Option<PathBuf>, VocabError> {
    let entries = fs::read_dir(dir).map_err(|source| VocabError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| VocabError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let matches_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(stem));
        let matches_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("tsv"));
        if matches_stem && matches_ext {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Load CONCEPT, CONCEPT_RELATIONSHIP and (optionally) SOURCE_TO_CONCEPT_MAP
/// from a vocabulary directory.
pub fn load_vocabulary_dir(
    dir: &Path,
    name_matched: &[String],
) -> Result<VocabularySnapshot, VocabError> {
    let concept_path = find_table_file(dir, "concept")?.ok_or_else(|| VocabError::MissingFile {
        path: dir.join("CONCEPT.csv"),
    })?;
    let relationship_path =
        find_table_file(dir, "concept_relationship")?.ok_or_else(|| VocabError::MissingFile {
            path: dir.join("CONCEPT_RELATIONSHIP.csv"),
        })?;
    let concepts = read_concepts(&concept_path)?;
    let relationships = read_concept_relationships(&relationship_path)?;
    let source_map = match find_table_file(dir, "source_to_concept_map")? {
        Some(path) => read_source_to_concept_map(&path)?,
        None => Vec::new(),
    };
    info!(
        dir = %dir.display(),
        concepts = concepts.len(),
        relationships = relationships.len(),
        source_map = source_map.len(),
        "loaded vocabulary"
    );
    Ok(VocabularySnapshot::new(concepts, relationships, source_map).with_name_matched(name_matched))
}
