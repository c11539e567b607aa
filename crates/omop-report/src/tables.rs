//! CSV output of emitted tables.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::info;

use omop_core::RunReport;
use omop_model::OmopTable;

pub fn table_file_name(table: OmopTable) -> String {
    format!("{}.csv", table.name())
}

pub fn rejected_file_name(table: OmopTable) -> String {
    format!("{}_rejected.csv", table.name())
}

/// Write a frame with a header row; nulls become empty fields.
pub fn write_frame_csv(path: &Path, df: &DataFrame) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write the emitted tables and retained rejected rows of a run.
pub fn write_table_outputs(output_dir: &Path, report: &RunReport) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::new();
    for table in report.emitted() {
        let path = output_dir.join(table_file_name(table.table()));
        write_frame_csv(&path, table.data())?;
        info!(
            table = %table.table(),
            rows = table.data().height(),
            path = %path.display(),
            "wrote table"
        );
        outputs.push(path);

        if let Some(rejected) = table.rejected() {
            let path = output_dir.join(rejected_file_name(table.table()));
            write_frame_csv(&path, rejected)?;
            info!(
                table = %table.table(),
                rows = rejected.height(),
                path = %path.display(),
                "wrote rejected rows"
            );
            outputs.push(path);
        }
    }
    Ok(outputs)
}
