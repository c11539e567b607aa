pub mod concept;
pub mod error;
pub mod issue;
pub mod options;
pub mod roles;
pub mod schema;
pub mod state;
pub mod summary;
pub mod table;
pub mod temporal;

pub use concept::{ConceptMapping, UNMAPPED_DOMAIN};
pub use error::{EtlError, Result};
pub use issue::{IssueKind, TableIssue};
pub use options::{
    DomainParams, EtlOptions, QuarantinePolicy, RecordTransform, TableOverrides, TieBreak,
    VocabularyOptions,
};
pub use roles::{ConceptColumn, TableRoles, roles_for};
pub use schema::{FieldSpec, FieldType, TableSchema, schema_for};
pub use state::TransformState;
pub use summary::{TableStatus, TableSummary};
pub use table::OmopTable;
pub use temporal::{Interval, ObservationPeriod};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_issue_kinds() {
        let summary = TableSummary {
            table: OmopTable::Measurement,
            status: TableStatus::Emitted,
            input_rows: 10,
            output_rows: 8,
            quarantined_rows: 1,
            issues: vec![
                TableIssue::new(
                    IssueKind::MappingGap,
                    "1 unmapped LOINC code(s) set to concept 0",
                )
                .with_column("measurement_source_value")
                .with_count(3),
                TableIssue::new(IssueKind::SchemaViolation, "end before start").with_count(1),
                TableIssue::new(IssueKind::Repaired, "null type concept").with_count(2),
            ],
            fingerprint: "abc".to_string(),
            failure: None,
        };
        assert_eq!(summary.warning_count(), 3);
        assert_eq!(summary.count_of(IssueKind::MappingGap), 1);
        assert!(summary.is_emitted());
    }

    #[test]
    fn summary_serializes() {
        let summary = TableSummary {
            table: OmopTable::Person,
            status: TableStatus::Failed,
            input_rows: 2,
            output_rows: 0,
            quarantined_rows: 0,
            issues: vec![],
            fingerprint: String::new(),
            failure: Some("missing column person_id".to_string()),
        };
        let json = serde_json::to_string(&summary).expect("serialize summary");
        assert!(json.contains("\"table\":\"person\""));
        assert!(json.contains("\"status\":\"failed\""));
    }
}
