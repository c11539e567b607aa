//! Machine-readable summary of a run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use omop_core::RunReport;
use omop_model::TableSummary;

pub const RUN_REPORT_FILE: &str = "run_report.json";

/// Contents of `run_report.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReportFile {
    /// RFC 3339 timestamp in UTC.
    pub generated_at: String,
    pub emitted: usize,
    pub failed: usize,
    pub warnings: usize,
    pub tables: Vec<TableSummary>,
}

impl RunReportFile {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            emitted: report.success_count(),
            failed: report.failure_count(),
            warnings: report.warning_count(),
            tables: report.summaries(),
        }
    }
}

pub fn write_run_report(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    let path = output_dir.join(RUN_REPORT_FILE);
    let contents = serde_json::to_string_pretty(&RunReportFile::from_report(report))
        .context("serialize run report")?;
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
