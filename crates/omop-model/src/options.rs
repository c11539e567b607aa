//! Configuration options for an ETL run.
//!
//! [`EtlOptions`] is the run-wide configuration (typically deserialized from
//! TOML by the CLI). Each transformer receives its own [`DomainParams`],
//! produced by [`EtlOptions::for_table`], which folds the per-table overrides
//! into the global defaults.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EtlError, Result};
use crate::table::OmopTable;

/// OMOP type concept for records derived from an EHR.
pub const EHR_TYPE_CONCEPT_ID: i64 = 32817;

/// Tie-break rule for the categorical mode of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The smallest tied value wins.
    #[default]
    LowestValue,
    /// The tied value seen first (in group order) wins.
    FirstSeen,
}

/// What happens to rows that break an invariant under lenient validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantinePolicy {
    /// Rows are removed and only counted in the table's warnings.
    #[default]
    Drop,
    /// Rows are removed from the table and kept in a rejected-rows frame.
    Retain,
}

/// Row-shape transforms applied to an extract before cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTransform {
    /// Split each row into two single-day events at its start and end dates.
    MeltStartEnd,
    /// Collapse every record to a single day at its start date.
    RemoveEndDate,
}

/// Reference vocabulary settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyOptions {
    /// Vocabularies whose source values are concept names rather than codes.
    pub name_matched: Vec<String>,
}

/// Per-table overrides; unset fields inherit the global value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOverrides {
    /// Source header -> working column name, applied before any other step.
    pub column_map: BTreeMap<String, String>,
    pub grace_window_days: Option<i64>,
    pub strict_validation: Option<bool>,
    pub default_concept_id: Option<i64>,
    pub default_type_concept_id: Option<i64>,
    pub group_window_days: Option<i64>,
    pub tie_break: Option<TieBreak>,
    /// Vocabularies tried, in order, when the declared one has no entry.
    pub fallback_vocabularies: Vec<String>,
    pub transforms: Vec<RecordTransform>,
    /// Column name -> (source value -> standard concept id) for unmapped values.
    pub unmapped_overrides: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Run-wide ETL configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlOptions {
    /// Days after `death_date` an event may still end.
    pub grace_window_days: i64,
    /// Abort a table on any invariant violation instead of quarantining rows.
    pub strict_validation: bool,
    /// Concept id assigned to unmapped source codes.
    pub default_concept_id: i64,
    /// Type concept used when a record carries none.
    pub default_type_concept_id: i64,
    /// Date-proximity window for temporal grouping (0 = same or overlapping dates).
    pub group_window_days: i64,
    pub tie_break: TieBreak,
    pub quarantine: QuarantinePolicy,
    pub vocabularies: VocabularyOptions,
    pub tables: BTreeMap<OmopTable, TableOverrides>,
}

impl Default for EtlOptions {
    fn default() -> Self {
        Self {
            grace_window_days: 60,
            strict_validation: false,
            default_concept_id: 0,
            default_type_concept_id: EHR_TYPE_CONCEPT_ID,
            group_window_days: 0,
            tie_break: TieBreak::default(),
            quarantine: QuarantinePolicy::default(),
            vocabularies: VocabularyOptions::default(),
            tables: BTreeMap::new(),
        }
    }
}

impl EtlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that abort a table on the first broken invariant.
    pub fn strict() -> Self {
        Self {
            strict_validation: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_grace_window_days(mut self, days: i64) -> Self {
        self.grace_window_days = days;
        self
    }

    #[must_use]
    pub fn with_group_window_days(mut self, days: i64) -> Self {
        self.group_window_days = days;
        self
    }

    #[must_use]
    pub fn with_default_concept_id(mut self, concept_id: i64) -> Self {
        self.default_concept_id = concept_id;
        self
    }

    #[must_use]
    pub fn with_quarantine(mut self, policy: QuarantinePolicy) -> Self {
        self.quarantine = policy;
        self
    }

    #[must_use]
    pub fn with_table(mut self, table: OmopTable, overrides: TableOverrides) -> Self {
        self.tables.insert(table, overrides);
        self
    }

    /// Rejects values no table could run with.
    pub fn validate(&self) -> Result<()> {
        for table in OmopTable::ALL {
            let params = self.for_table(table);
            if params.grace_window_days < 0 {
                return Err(EtlError::Config(format!(
                    "{table}: grace_window_days must not be negative"
                )));
            }
            if params.group_window_days < 0 {
                return Err(EtlError::Config(format!(
                    "{table}: group_window_days must not be negative"
                )));
            }
            let mut targets = BTreeSet::new();
            for target in params.column_map.values() {
                if !targets.insert(target.as_str()) {
                    return Err(EtlError::Config(format!(
                        "{table}: column_map renames two columns to `{target}`"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Resolve the parameters for one table.
    pub fn for_table(&self, table: OmopTable) -> DomainParams {
        let overrides = self.tables.get(&table).cloned().unwrap_or_default();
        DomainParams {
            table,
            column_map: overrides.column_map,
            grace_window_days: overrides
                .grace_window_days
                .unwrap_or(self.grace_window_days),
            strict_validation: overrides
                .strict_validation
                .unwrap_or(self.strict_validation),
            default_concept_id: overrides
                .default_concept_id
                .unwrap_or(self.default_concept_id),
            default_type_concept_id: overrides
                .default_type_concept_id
                .unwrap_or(self.default_type_concept_id),
            group_window_days: overrides
                .group_window_days
                .unwrap_or(self.group_window_days),
            tie_break: overrides.tie_break.unwrap_or(self.tie_break),
            quarantine: self.quarantine,
            fallback_vocabularies: overrides.fallback_vocabularies,
            transforms: overrides.transforms,
            unmapped_overrides: overrides.unmapped_overrides,
        }
    }
}

/// Parameters in effect for one table, recorded for provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainParams {
    pub table: OmopTable,
    pub column_map: BTreeMap<String, String>,
    pub grace_window_days: i64,
    pub strict_validation: bool,
    pub default_concept_id: i64,
    pub default_type_concept_id: i64,
    pub group_window_days: i64,
    pub tie_break: TieBreak,
    pub quarantine: QuarantinePolicy,
    pub fallback_vocabularies: Vec<String>,
    pub transforms: Vec<RecordTransform>,
    pub unmapped_overrides: BTreeMap<String, BTreeMap<String, i64>>,
}

impl DomainParams {
    /// Hex SHA-256 of the canonical JSON encoding of these parameters.
    pub fn fingerprint(&self) -> String {
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&encoded))
    }

    /// Override for an unmapped value of `column`, if configured.
    pub fn unmapped_override(&self, column: &str, source_value: &str) -> Option<i64> {
        self.unmapped_overrides
            .get(column)
            .and_then(|values| values.get(source_value))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_overrides_fall_back_to_globals() {
        let options = EtlOptions::default().with_table(
            OmopTable::Measurement,
            TableOverrides {
                group_window_days: Some(7),
                ..TableOverrides::default()
            },
        );
        let measurement = options.for_table(OmopTable::Measurement);
        let visit = options.for_table(OmopTable::VisitOccurrence);
        assert_eq!(measurement.group_window_days, 7);
        assert_eq!(measurement.grace_window_days, 60);
        assert_eq!(visit.group_window_days, 0);
    }

    #[test]
    fn fingerprint_tracks_parameters() {
        let options = EtlOptions::default();
        let a = options.for_table(OmopTable::Death);
        let b = options.for_table(OmopTable::Death);
        let c = EtlOptions::strict().for_table(OmopTable::Death);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn negative_windows_are_rejected() {
        let options = EtlOptions::default().with_grace_window_days(-1);
        assert!(matches!(options.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn column_map_targets_must_be_distinct() {
        let column_map = [("dx_date", "start_date"), ("visit_date", "start_date")]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        let options = EtlOptions::default().with_table(
            OmopTable::ConditionOccurrence,
            TableOverrides {
                column_map,
                ..TableOverrides::default()
            },
        );
        let err = options.validate().expect_err("duplicate target");
        assert!(err.to_string().contains("start_date"));
    }
}
