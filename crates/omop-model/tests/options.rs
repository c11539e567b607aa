//! Tests for deserializing run options from TOML.

use omop_model::{EtlOptions, OmopTable, QuarantinePolicy, RecordTransform, TieBreak};

#[test]
fn empty_document_uses_defaults() {
    let options: EtlOptions = toml::from_str("").expect("parse options");
    assert_eq!(options.grace_window_days, 60);
    assert!(!options.strict_validation);
    assert_eq!(options.default_concept_id, 0);
    assert_eq!(options.quarantine, QuarantinePolicy::Drop);
}

#[test]
fn table_sections_override_globals() {
    let options: EtlOptions = toml::from_str(
        r#"
        strict_validation = true
        tie_break = "first_seen"
        quarantine = "retain"

        [vocabularies]
        name_matched = ["Local Gender"]

        [tables.measurement]
        group_window_days = 3
        fallback_vocabularies = ["LOINC", "SNOMED"]

        [tables.measurement.unmapped_overrides.unit_source_value]
        "mg/dl" = 8840

        [tables.drug_exposure]
        transforms = ["remove_end_date"]
        strict_validation = false

        [tables.provider.column_map]
        prov_code = "provider_source_value"
        "#,
    )
    .expect("parse options");

    let measurement = options.for_table(OmopTable::Measurement);
    assert!(measurement.strict_validation);
    assert_eq!(measurement.group_window_days, 3);
    assert_eq!(measurement.tie_break, TieBreak::FirstSeen);
    assert_eq!(measurement.fallback_vocabularies, vec!["LOINC", "SNOMED"]);
    assert_eq!(
        measurement.unmapped_override("unit_source_value", "mg/dl"),
        Some(8840)
    );

    let drugs = options.for_table(OmopTable::DrugExposure);
    assert!(!drugs.strict_validation);
    assert_eq!(drugs.transforms, vec![RecordTransform::RemoveEndDate]);
    assert_eq!(drugs.quarantine, QuarantinePolicy::Retain);
    assert_eq!(options.vocabularies.name_matched, vec!["Local Gender"]);

    let provider = options.for_table(OmopTable::Provider);
    assert_eq!(
        provider.column_map.get("prov_code").map(String::as_str),
        Some("provider_source_value")
    );
    assert!(measurement.column_map.is_empty());
}
