//! End-to-end runs of the pipeline over small in-memory extracts.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame};

use omop_core::{PipelineRunner, TableOutcome};
use omop_model::{EtlOptions, IssueKind, OmopTable, TableOverrides, TransformState};
use omop_transform::frame::{date_column, i64_column, text_column};
use omop_vocab::{Concept, ConceptRelationship, MAPS_TO, VocabularySnapshot};

fn d(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn concept(id: i64, domain: &str, vocab: &str, code: &str, standard: bool) -> Concept {
    Concept {
        concept_id: id,
        concept_name: code.to_string(),
        domain_id: domain.to_string(),
        vocabulary_id: vocab.to_string(),
        concept_code: code.to_string(),
        standard_concept: standard.then(|| "S".to_string()),
    }
}

fn vocabulary() -> Arc<VocabularySnapshot> {
    Arc::new(VocabularySnapshot::new(
        vec![
            concept(8_507, "Gender", "Gender", "M", true),
            concept(8_532, "Gender", "Gender", "F", true),
            concept(9_201, "Visit", "Visit", "IP", true),
            concept(9_202, "Visit", "Visit", "OP", true),
            concept(38_004_446, "Provider", "Medicare Specialty", "GP", true),
            concept(35_208_000, "Condition", "ICD10CM", "E11", false),
            concept(201_826, "Condition", "SNOMED", "44054006", true),
        ],
        vec![ConceptRelationship {
            concept_id_1: 35_208_000,
            concept_id_2: 201_826,
            relationship_id: MAPS_TO.to_string(),
        }],
        Vec::new(),
    ))
}

fn frame(columns: &[(&str, &[Option<&str>])]) -> DataFrame {
    DataFrame::new(
        columns
            .iter()
            .map(|(name, values)| Column::new((*name).into(), values.to_vec()))
            .collect(),
    )
    .expect("frame")
}

fn people() -> DataFrame {
    frame(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("start_date", &[Some("1970-05-01"), Some("1985-11-20")]),
        ("gender_source_value", &[Some("M"), Some("F")]),
    ])
}

fn periods() -> DataFrame {
    frame(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("start_date", &[Some("2019-01-01"), Some("2019-01-01")]),
        ("end_date", &[Some("2021-12-31"), Some("2021-12-31")]),
    ])
}

fn visits() -> DataFrame {
    frame(&[
        ("person_id", &[Some("1"), Some("1")]),
        ("start_date", &[Some("2020-01-01"), Some("2020-01-03")]),
        ("end_date", &[Some("2020-01-05"), Some("2020-01-08")]),
        ("visit_source_value", &[Some("IP"), Some("IP")]),
    ])
}

fn inputs(extra: Vec<(OmopTable, DataFrame)>) -> BTreeMap<OmopTable, DataFrame> {
    let mut inputs = BTreeMap::from([
        (OmopTable::Person, people()),
        (OmopTable::ObservationPeriod, periods()),
    ]);
    inputs.extend(extra);
    inputs
}

fn runner(options: EtlOptions) -> PipelineRunner {
    PipelineRunner::new(vocabulary(), options).expect("runner")
}

#[test]
fn overlapping_inpatient_visits_are_merged() {
    let report = runner(EtlOptions::default())
        .run(inputs(vec![(OmopTable::VisitOccurrence, visits())]));

    let visit = report.table(OmopTable::VisitOccurrence).expect("visits emitted");
    let data = visit.data();
    assert_eq!(data.height(), 1);
    assert_eq!(
        date_column(data, "visit_start_date").expect("start").values,
        vec![d("2020-01-01")]
    );
    assert_eq!(
        date_column(data, "visit_end_date").expect("end").values,
        vec![d("2020-01-08")]
    );
    assert_eq!(
        i64_column(data, "visit_concept_id").expect("concept"),
        vec![Some(9_201)]
    );
    assert_eq!(visit.input_rows(), 2);
}

#[test]
fn unmapped_code_gets_default_concept_and_one_gap() {
    let conditions = frame(&[
        ("person_id", &[Some("1"), Some("1"), Some("2")]),
        (
            "start_date",
            &[Some("2020-02-01"), Some("2020-06-01"), Some("2020-03-01")],
        ),
        ("condition_source_value", &[Some("ZZ9"), Some("ZZ9"), Some("E11")]),
    ]);
    let report = runner(EtlOptions::default())
        .run(inputs(vec![(OmopTable::ConditionOccurrence, conditions)]));

    let condition = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted");
    let data = condition.data();
    let concepts = i64_column(data, "condition_concept_id").expect("concepts");
    let sources = text_column(data, "condition_source_value").expect("sources");
    assert_eq!(data.height(), 3);
    for (concept, source) in concepts.iter().zip(&sources) {
        match source.as_deref() {
            Some("ZZ9") => assert_eq!(*concept, Some(0)),
            Some("E11") => assert_eq!(*concept, Some(201_826)),
            other => panic!("unexpected source value {other:?}"),
        }
    }

    let gaps: Vec<_> = condition
        .issues()
        .iter()
        .filter(|issue| issue.kind == IssueKind::MappingGap)
        .collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].count, 2);
    assert_eq!(gaps[0].column.as_deref(), Some("condition_concept_id"));
}

#[test]
fn failed_table_does_not_stop_siblings() {
    let broken = frame(&[
        ("person_id", &[Some("1")]),
        ("drug_source_value", &[Some("12345")]),
    ]);
    let report = runner(EtlOptions::default()).run(inputs(vec![
        (OmopTable::DrugExposure, broken),
        (OmopTable::VisitOccurrence, visits()),
    ]));

    assert!(report.has_failures());
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.success_count(), 3);
    assert!(report.table(OmopTable::DrugExposure).is_none());
    assert!(report.table(OmopTable::VisitOccurrence).is_some());

    match report.outcome(OmopTable::DrugExposure) {
        Some(TableOutcome::Failed(failure)) => {
            assert_eq!(failure.stage, TransformState::Gathered);
            assert!(failure.reason.contains("start_date"));
        }
        other => panic!("expected a failed drug table, got {other:?}"),
    }

    let summaries = report.summaries();
    let drug = summaries
        .iter()
        .find(|summary| summary.table == OmopTable::DrugExposure)
        .expect("drug summary");
    assert!(!drug.is_emitted());
    assert_eq!(drug.output_rows, 0);
    assert!(drug.failure.as_deref().is_some_and(|f| f.starts_with("GATHERED")));
}

#[test]
fn strict_validation_aborts_only_the_offending_table() {
    let conditions = frame(&[
        ("person_id", &[Some("1")]),
        ("start_date", &[Some("2020-05-10")]),
        ("end_date", &[Some("2020-05-01")]),
        ("condition_source_value", &[Some("E11")]),
    ]);
    let report = runner(EtlOptions::strict())
        .run(inputs(vec![(OmopTable::ConditionOccurrence, conditions)]));

    match report.outcome(OmopTable::ConditionOccurrence) {
        Some(TableOutcome::Failed(failure)) => {
            assert_eq!(failure.stage, TransformState::Validated);
            assert!(failure.reason.contains("end_before_start"));
        }
        other => panic!("expected a failed condition table, got {other:?}"),
    }
    assert!(report.table(OmopTable::Person).is_some());
}

#[test]
fn lenient_validation_quarantines_rows_outside_observation() {
    let conditions = frame(&[
        ("person_id", &[Some("1"), Some("1"), Some("3")]),
        (
            "start_date",
            &[Some("2020-05-10"), Some("2023-01-01"), Some("2020-05-10")],
        ),
        ("condition_source_value", &[Some("E11"), Some("E11"), Some("E11")]),
    ]);
    let report = runner(EtlOptions::default())
        .run(inputs(vec![(OmopTable::ConditionOccurrence, conditions)]));

    let condition = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted");
    assert_eq!(condition.data().height(), 1);
    assert_eq!(condition.quarantined(), 2);
    let violations = condition
        .issues()
        .iter()
        .filter(|issue| issue.kind == IssueKind::SchemaViolation)
        .count();
    assert_eq!(violations, 2);
}

#[test]
fn events_are_linked_to_the_enclosing_visit() {
    let conditions = frame(&[
        ("person_id", &[Some("1"), Some("1")]),
        ("start_date", &[Some("2020-01-04"), Some("2020-03-01")]),
        ("condition_source_value", &[Some("E11"), Some("E11")]),
    ]);
    let report = runner(EtlOptions::default()).run(inputs(vec![
        (OmopTable::VisitOccurrence, visits()),
        (OmopTable::ConditionOccurrence, conditions),
    ]));

    let visit_ids = i64_column(
        report
            .table(OmopTable::VisitOccurrence)
            .expect("visits")
            .data(),
        "visit_occurrence_id",
    )
    .expect("visit ids");
    let data = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions")
        .data();
    assert_eq!(
        i64_column(data, "visit_occurrence_id").expect("links"),
        vec![visit_ids[0], None]
    );
}

#[test]
fn missing_observation_periods_skip_the_check_with_a_warning() {
    let conditions = frame(&[
        ("person_id", &[Some("1")]),
        ("start_date", &[Some("2030-01-01")]),
        ("condition_source_value", &[Some("E11")]),
    ]);
    let mut inputs = inputs(vec![(OmopTable::ConditionOccurrence, conditions)]);
    inputs.remove(&OmopTable::ObservationPeriod);
    let report = runner(EtlOptions::default()).run(inputs);

    let condition = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted");
    assert_eq!(condition.data().height(), 1);
    assert!(
        condition
            .issues()
            .iter()
            .any(|issue| issue.kind == IssueKind::Skipped)
    );
}

#[test]
fn person_table_derives_birth_components() {
    let report = runner(EtlOptions::default()).run(inputs(Vec::new()));

    let person = report.table(OmopTable::Person).expect("person emitted");
    let data = person.data();
    assert_eq!(i64_column(data, "person_id").expect("ids"), vec![Some(1), Some(2)]);
    assert_eq!(
        i64_column(data, "year_of_birth").expect("years"),
        vec![Some(1970), Some(1985)]
    );
    assert_eq!(
        i64_column(data, "month_of_birth").expect("months"),
        vec![Some(5), Some(11)]
    );
    assert_eq!(
        i64_column(data, "gender_concept_id").expect("gender"),
        vec![Some(8_507), Some(8_532)]
    );
    assert_eq!(
        text_column(data, "birth_datetime").expect("birth"),
        vec![
            Some("1970-05-01 00:00:00".to_string()),
            Some("1985-11-20 00:00:00".to_string())
        ]
    );
    assert_eq!(report.outcomes().count(), 2);
}

fn violations(report: &omop_core::RunReport, table: OmopTable) -> Vec<String> {
    report
        .table(table)
        .expect("table emitted")
        .issues()
        .iter()
        .filter(|issue| issue.kind == IssueKind::SchemaViolation)
        .map(|issue| issue.message.clone())
        .collect()
}

#[test]
fn death_before_birth_is_quarantined() {
    let deaths = frame(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("start_date", &[Some("1950-01-01"), Some("2021-06-01")]),
    ]);
    let report = runner(EtlOptions::default()).run(inputs(vec![(OmopTable::Death, deaths)]));

    let death = report.table(OmopTable::Death).expect("death emitted");
    assert_eq!(i64_column(death.data(), "person_id").expect("ids"), vec![Some(2)]);
    assert_eq!(death.quarantined(), 1);
    let messages = violations(&report, OmopTable::Death);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("before_birth"));
}

#[test]
fn observation_period_before_birth_is_quarantined() {
    let periods = frame(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("start_date", &[Some("1960-01-01"), Some("2019-01-01")]),
        ("end_date", &[Some("2021-12-31"), Some("2021-12-31")]),
    ]);
    let report =
        runner(EtlOptions::default()).run(inputs(vec![(OmopTable::ObservationPeriod, periods)]));

    let period = report
        .table(OmopTable::ObservationPeriod)
        .expect("periods emitted");
    assert_eq!(i64_column(period.data(), "person_id").expect("ids"), vec![Some(2)]);
    let messages = violations(&report, OmopTable::ObservationPeriod);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("before_birth"));
}

#[test]
fn event_before_birth_reports_a_before_birth_violation() {
    let conditions = frame(&[
        ("person_id", &[Some("1"), Some("1")]),
        ("start_date", &[Some("1969-12-31"), Some("2020-05-10")]),
        ("condition_source_value", &[Some("E11"), Some("E11")]),
    ]);
    let mut inputs = inputs(vec![(OmopTable::ConditionOccurrence, conditions)]);
    inputs.remove(&OmopTable::ObservationPeriod);
    let report = runner(EtlOptions::default()).run(inputs);

    let condition = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted");
    assert_eq!(condition.data().height(), 1);
    assert_eq!(condition.quarantined(), 1);
    let messages = violations(&report, OmopTable::ConditionOccurrence);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("before_birth"));
}

#[test]
fn events_of_persons_missing_from_person_are_quarantined() {
    let conditions = frame(&[
        ("person_id", &[Some("1"), Some("99")]),
        ("start_date", &[Some("2020-05-10"), Some("2020-05-10")]),
        ("condition_source_value", &[Some("E11"), Some("E11")]),
    ]);
    let mut inputs = inputs(vec![(OmopTable::ConditionOccurrence, conditions)]);
    inputs.remove(&OmopTable::ObservationPeriod);
    let report = runner(EtlOptions::default()).run(inputs);

    let condition = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted");
    assert_eq!(
        i64_column(condition.data(), "person_id").expect("ids"),
        vec![Some(1)]
    );
    let messages = violations(&report, OmopTable::ConditionOccurrence);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("unknown_person"));
}

#[test]
fn missing_person_table_skips_the_person_check() {
    let conditions = frame(&[
        ("person_id", &[Some("99")]),
        ("start_date", &[Some("2020-05-10")]),
        ("condition_source_value", &[Some("E11")]),
    ]);
    let inputs = BTreeMap::from([(OmopTable::ConditionOccurrence, conditions)]);
    let report = runner(EtlOptions::default()).run(inputs);

    let condition = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted");
    assert_eq!(condition.data().height(), 1);
    assert!(condition.issues().iter().any(|issue| {
        issue.kind == IssueKind::Skipped && issue.message.starts_with("person check skipped")
    }));
}

#[test]
fn gap_issue_does_not_carry_source_codes() {
    let conditions = frame(&[
        ("person_id", &[Some("1")]),
        ("start_date", &[Some("2020-02-01")]),
        ("condition_source_value", &[Some("ZZ9")]),
    ]);
    let report = runner(EtlOptions::default())
        .run(inputs(vec![(OmopTable::ConditionOccurrence, conditions)]));

    let condition = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted");
    let gap = condition
        .issues()
        .iter()
        .find(|issue| issue.kind == IssueKind::MappingGap)
        .expect("gap issue");
    assert!(!gap.message.contains("ZZ9"));
    assert!(gap.message.contains("ICD10CM"));
}

#[test]
fn visits_are_linked_to_providers_by_source_value() {
    let providers = frame(&[
        ("provider_source_value", &[Some("DR1"), Some("DR2"), Some("DR1")]),
        ("specialty_source_value", &[Some("GP"), Some("XX"), Some("GP")]),
    ]);
    let visits = frame(&[
        ("person_id", &[Some("1"), Some("2")]),
        ("start_date", &[Some("2020-01-01"), Some("2020-02-01")]),
        ("visit_source_value", &[Some("OP"), Some("OP")]),
        ("provider_source_value", &[Some("DR2"), Some("DR9")]),
    ]);
    let report = runner(EtlOptions::default()).run(inputs(vec![
        (OmopTable::Provider, providers),
        (OmopTable::VisitOccurrence, visits),
    ]));

    let provider = report.table(OmopTable::Provider).expect("providers emitted");
    let data = provider.data();
    assert_eq!(data.height(), 2);
    assert_eq!(
        i64_column(data, "specialty_concept_id").expect("specialty"),
        vec![Some(38_004_446), Some(0)]
    );
    let ids = i64_column(data, "provider_id").expect("provider ids");
    let codes = text_column(data, "provider_source_value").expect("codes");
    let dr2 = codes
        .iter()
        .position(|code| code.as_deref() == Some("DR2"))
        .and_then(|idx| ids[idx]);

    let visit = report.table(OmopTable::VisitOccurrence).expect("visits emitted");
    assert_eq!(
        i64_column(visit.data(), "provider_id").expect("links"),
        vec![dr2, None]
    );
    assert!(visit.issues().iter().any(|issue| {
        issue.kind == IssueKind::MappingGap && issue.column.as_deref() == Some("provider_id")
    }));
}

#[test]
fn provider_lookup_is_skipped_without_a_provider_table() {
    let visits = frame(&[
        ("person_id", &[Some("1")]),
        ("start_date", &[Some("2020-01-01")]),
        ("visit_source_value", &[Some("OP")]),
        ("provider_source_value", &[Some("DR1")]),
    ]);
    let report = runner(EtlOptions::default())
        .run(inputs(vec![(OmopTable::VisitOccurrence, visits)]));

    let visit = report.table(OmopTable::VisitOccurrence).expect("visits emitted");
    assert_eq!(
        i64_column(visit.data(), "provider_id").expect("links"),
        vec![None]
    );
    assert!(visit.issues().iter().any(|issue| {
        issue.kind == IssueKind::Skipped && issue.message.starts_with("provider lookup skipped")
    }));
}

#[test]
fn column_map_renames_source_headers() {
    let conditions = frame(&[
        ("patient", &[Some("1")]),
        ("onset", &[Some("2020-05-10")]),
        ("condition_source_value", &[Some("E11")]),
    ]);
    let mut options = EtlOptions::default();
    options.tables.insert(
        OmopTable::ConditionOccurrence,
        TableOverrides {
            column_map: BTreeMap::from([
                ("patient".to_string(), "person_id".to_string()),
                ("onset".to_string(), "start_date".to_string()),
            ]),
            ..TableOverrides::default()
        },
    );
    let report = runner(options).run(inputs(vec![(OmopTable::ConditionOccurrence, conditions)]));

    let data = report
        .table(OmopTable::ConditionOccurrence)
        .expect("conditions emitted")
        .data();
    assert_eq!(i64_column(data, "person_id").expect("ids"), vec![Some(1)]);
    assert_eq!(
        date_column(data, "condition_start_date").expect("start").values,
        vec![d("2020-05-10")]
    );
}
