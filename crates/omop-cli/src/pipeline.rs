//! Manifest-driven pipeline run: load, transform, write.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::{info, info_span};

use omop_core::{PipelineRunner, RunReport};
use omop_ingest::{discover_table_files, read_csv_frame};
use omop_model::OmopTable;
use omop_vocab::load_vocabulary_dir;

use crate::manifest::RunManifest;

/// Result of a run, with the files it wrote.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
}

/// Locate the extract of every table: explicit manifest entries first, then
/// files in the input directory named after a table.
pub fn resolve_inputs(manifest: &RunManifest) -> Result<BTreeMap<OmopTable, PathBuf>> {
    let mut inputs = if manifest.input_dir.is_dir() {
        discover_table_files(&manifest.input_dir)
            .with_context(|| format!("scan {}", manifest.input_dir.display()))?
    } else {
        BTreeMap::new()
    };
    inputs.extend(
        manifest
            .inputs
            .iter()
            .map(|(table, path)| (*table, path.clone())),
    );
    Ok(inputs)
}

pub fn read_inputs(files: &BTreeMap<OmopTable, PathBuf>) -> Result<BTreeMap<OmopTable, DataFrame>> {
    files
        .iter()
        .map(|(table, path)| {
            let frame =
                read_csv_frame(path).with_context(|| format!("read {}", path.display()))?;
            info!(table = %table, rows = frame.height(), file = %path.display(), "loaded extract");
            Ok((*table, frame))
        })
        .collect()
}

/// Run the manifest end to end. Without `write`, nothing is written.
pub fn run_manifest(manifest: &RunManifest, write: bool) -> Result<RunOutcome> {
    let span = info_span!("run", output = %manifest.output_dir.display());
    let _guard = span.enter();

    let vocabulary = load_vocabulary_dir(
        &manifest.vocabulary_dir,
        &manifest.options.vocabularies.name_matched,
    )
    .with_context(|| format!("load vocabulary {}", manifest.vocabulary_dir.display()))?;
    let files = resolve_inputs(manifest)?;
    anyhow::ensure!(
        !files.is_empty(),
        "no table extracts found in {}",
        manifest.input_dir.display()
    );
    let inputs = read_inputs(&files)?;

    let runner = PipelineRunner::new(Arc::new(vocabulary), manifest.options.clone())
        .context("invalid options")?;
    let report = runner.run(inputs);

    let written = if write {
        omop_report::write_outputs(&manifest.output_dir, &report)?
    } else {
        Vec::new()
    };
    Ok(RunOutcome {
        report,
        output_dir: manifest.output_dir.clone(),
        written,
    })
}
