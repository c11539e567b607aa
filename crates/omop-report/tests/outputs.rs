//! Writing emitted tables and the run report to disk.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use polars::prelude::{Column, DataFrame};

use omop_core::PipelineRunner;
use omop_model::{EtlOptions, OmopTable, QuarantinePolicy, TableStatus};
use omop_report::{RUN_REPORT_FILE, RunReportFile, write_outputs};
use omop_vocab::VocabularySnapshot;

fn frame(columns: &[(&str, &[Option<&str>])]) -> DataFrame {
    DataFrame::new(
        columns
            .iter()
            .map(|(name, values)| Column::new((*name).into(), values.to_vec()))
            .collect(),
    )
    .expect("frame")
}

fn run_report() -> omop_core::RunReport {
    let inputs = BTreeMap::from([
        (
            OmopTable::Person,
            frame(&[
                ("person_id", &[Some("1")]),
                ("start_date", &[Some("1970-05-01")]),
            ]),
        ),
        (
            OmopTable::ConditionOccurrence,
            frame(&[
                ("person_id", &[Some("1"), None]),
                ("start_date", &[Some("2020-01-01"), Some("2020-01-02")]),
                ("condition_source_value", &[Some("I10"), Some("I10")]),
            ]),
        ),
        (
            OmopTable::Measurement,
            frame(&[("person_id", &[Some("1")])]),
        ),
    ]);
    let options = EtlOptions::default().with_quarantine(QuarantinePolicy::Retain);
    PipelineRunner::new(Arc::new(VocabularySnapshot::default()), options)
        .expect("runner")
        .run(inputs)
}

#[test]
fn writes_tables_rejected_rows_and_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = run_report();
    let outputs = write_outputs(dir.path(), &report).expect("write outputs");

    let names: Vec<String> = outputs
        .iter()
        .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
        .collect();
    assert_eq!(
        names,
        vec![
            "person.csv",
            "condition_occurrence.csv",
            "condition_occurrence_rejected.csv",
            RUN_REPORT_FILE,
        ]
    );

    let conditions = fs::read_to_string(dir.path().join("condition_occurrence.csv"))
        .expect("conditions csv");
    let mut lines = conditions.lines();
    let header = lines.next().expect("header");
    assert!(header.starts_with("condition_occurrence_id,person_id,condition_concept_id"));
    assert_eq!(lines.count(), 1);

    let rejected = fs::read_to_string(dir.path().join("condition_occurrence_rejected.csv"))
        .expect("rejected csv");
    assert!(rejected.lines().next().expect("header").ends_with("rejection_reason"));
    assert!(rejected.contains("missing_person"));
}

#[test]
fn run_report_lists_failures_with_reasons() {
    let dir = tempfile::tempdir().expect("tempdir");
    let report = run_report();
    write_outputs(dir.path(), &report).expect("write outputs");

    let json = fs::read_to_string(dir.path().join(RUN_REPORT_FILE)).expect("report");
    let parsed: RunReportFile = serde_json::from_str(&json).expect("parse report");
    assert_eq!(parsed.emitted, 2);
    assert_eq!(parsed.failed, 1);

    let measurement = parsed
        .tables
        .iter()
        .find(|summary| summary.table == OmopTable::Measurement)
        .expect("measurement summary");
    assert_eq!(measurement.status, TableStatus::Failed);
    assert!(
        measurement
            .failure
            .as_deref()
            .is_some_and(|reason| reason.contains("start_date"))
    );
    assert_eq!(measurement.fingerprint.len(), 64);
}
