//! Output writers for a pipeline run.
//!
//! - **Tables**: one `<table>.csv` per emitted CDM table
//! - **Rejected rows**: `<table>_rejected.csv` when rows were retained
//! - **Run report**: `run_report.json` with per-table summaries

mod run_report;
mod tables;

pub use run_report::{RUN_REPORT_FILE, RunReportFile, write_run_report};
pub use tables::{rejected_file_name, table_file_name, write_frame_csv, write_table_outputs};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use omop_core::RunReport;

/// Write every output of a run into `output_dir`.
pub fn write_outputs(output_dir: &Path, report: &RunReport) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("create {}", output_dir.display()))?;
    let mut outputs = write_table_outputs(output_dir, report)?;
    outputs.push(write_run_report(output_dir, report)?);
    Ok(outputs)
}
