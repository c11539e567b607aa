//! Rendering of the run summary table.

use omop_cli::summary::{SummaryStyle, render_issues, render_summary};
use omop_model::{IssueKind, OmopTable, TableIssue, TableStatus, TableSummary};

fn summary(
    table: OmopTable,
    rows: (usize, usize, usize),
    issues: Vec<TableIssue>,
    failure: Option<&str>,
) -> TableSummary {
    TableSummary {
        table,
        status: if failure.is_some() {
            TableStatus::Failed
        } else {
            TableStatus::Emitted
        },
        input_rows: rows.0,
        output_rows: rows.1,
        quarantined_rows: rows.2,
        issues,
        fingerprint: String::new(),
        failure: failure.map(str::to_string),
    }
}

fn summaries() -> Vec<TableSummary> {
    vec![
        summary(
            OmopTable::Measurement,
            (1, 0, 0),
            Vec::new(),
            Some("GATHERED: missing start_date"),
        ),
        summary(
            OmopTable::ConditionOccurrence,
            (3, 2, 1),
            vec![
                TableIssue::new(IssueKind::SchemaViolation, "person_id is null")
                    .with_column("person_id"),
                TableIssue::new(
                    IssueKind::MappingGap,
                    "1 unmapped ICD10CM code(s) set to concept 0",
                )
                .with_column("condition_concept_id")
                .with_count(2),
            ],
            None,
        ),
        summary(OmopTable::Person, (2, 2, 0), Vec::new(), None),
    ]
}

#[test]
fn plain_summary_lists_tables_in_dependency_order() {
    let rendered = render_summary(&summaries(), SummaryStyle::Plain);
    insta::assert_snapshot!(rendered, @r"
    | Table                | Status      | Input | Output | Quarantined | Warnings | Failure                      |
    |----------------------|-------------|-------|--------|-------------|----------|------------------------------|
    | person               | emitted     |     2 |      2 |           0 |        0 | -                            |
    | condition_occurrence | emitted     |     3 |      2 |           1 |        2 | -                            |
    | measurement          | failed      |     1 |      0 |           0 |        0 | GATHERED: missing start_date |
    | TOTAL                | 2/3 emitted |     6 |      4 |           1 |        2 | -                            |
    ");
}

#[test]
fn issues_are_grouped_by_table_and_kind() {
    let rendered = render_issues(&summaries(), SummaryStyle::Plain).expect("issues");
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[2].contains("mapping_gap"));
    assert!(lines[3].contains("schema_violation"));
    assert!(lines[2].contains("1 unmapped ICD10CM code(s) set to concept 0"));
}

#[test]
fn no_issues_renders_nothing() {
    let clean = vec![summary(OmopTable::Person, (1, 1, 0), Vec::new(), None)];
    assert!(render_issues(&clean, SummaryStyle::Plain).is_none());
}
