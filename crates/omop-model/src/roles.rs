//! Column roles of each table during transformation.
//!
//! Extracts and intermediate frames use the same working names for every
//! table (`person_id`, `start_date`, `end_date`, `type_concept`, ...), so the
//! shared stages need no per-table branching. Concept columns already carry
//! their CDM names. At emission the working names are renamed to the CDM
//! columns listed here.

use crate::table::OmopTable;

pub const PERSON_ID: &str = "person_id";
pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";
pub const TYPE_CONCEPT: &str = "type_concept";
pub const PROVIDER_ID: &str = "provider_id";
pub const VOCABULARY_ID: &str = "vocabulary_id";
pub const VISIT_OCCURRENCE_ID: &str = "visit_occurrence_id";
/// Source code of the provider, resolved to `provider_id` through PROVIDER.
pub const PROVIDER_SOURCE_VALUE: &str = "provider_source_value";

/// A source value resolved to a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConceptColumn {
    /// Text column holding the source code (or name).
    pub source_value: &'static str,
    /// Optional per-row vocabulary column.
    pub vocabulary_column: &'static str,
    /// Vocabulary used when the row declares none.
    pub default_vocabulary: &'static str,
    pub concept_id: &'static str,
    pub source_concept_id: Option<&'static str>,
    /// The CDM requires a concept id; nulls are repaired to the default concept.
    pub required: bool,
}

/// Working-to-CDM column roles of one table.
#[derive(Debug, Clone, Copy)]
pub struct TableRoles {
    pub table: OmopTable,
    /// CDM column for the event (or birth) date, if the table has one.
    pub start: Option<&'static str>,
    /// CDM column for the end date, if the table has one.
    pub end: Option<&'static str>,
    /// The CDM requires an end date; missing ends are repaired to the start.
    pub end_required: bool,
    /// CDM column for the type concept, if the table has one.
    pub type_concept: Option<&'static str>,
    pub concepts: &'static [ConceptColumn],
}

impl TableRoles {
    /// CDM name of a working column (identity for everything else).
    pub fn cdm_column<'a>(&self, working: &'a str) -> Option<&'a str> {
        match working {
            START_DATE => self.start,
            END_DATE => self.end,
            TYPE_CONCEPT => self.type_concept,
            VOCABULARY_ID => None,
            other => Some(other),
        }
    }

    pub fn primary_concept(&self) -> Option<&ConceptColumn> {
        self.concepts.first()
    }
}

const fn concept(
    prefix_source: &'static str,
    vocabulary_column: &'static str,
    default_vocabulary: &'static str,
    concept_id: &'static str,
    source_concept_id: Option<&'static str>,
    required: bool,
) -> ConceptColumn {
    ConceptColumn {
        source_value: prefix_source,
        vocabulary_column,
        default_vocabulary,
        concept_id,
        source_concept_id,
        required,
    }
}

const PERSON_CONCEPTS: &[ConceptColumn] = &[
    concept(
        "gender_source_value",
        "gender_vocabulary_id",
        "Gender",
        "gender_concept_id",
        Some("gender_source_concept_id"),
        true,
    ),
    concept(
        "race_source_value",
        "race_vocabulary_id",
        "Race",
        "race_concept_id",
        Some("race_source_concept_id"),
        true,
    ),
    concept(
        "ethnicity_source_value",
        "ethnicity_vocabulary_id",
        "Ethnicity",
        "ethnicity_concept_id",
        Some("ethnicity_source_concept_id"),
        true,
    ),
];

const PROVIDER_CONCEPTS: &[ConceptColumn] = &[
    concept(
        "specialty_source_value",
        "specialty_vocabulary_id",
        "Medicare Specialty",
        "specialty_concept_id",
        Some("specialty_source_concept_id"),
        false,
    ),
    concept(
        "gender_source_value",
        "gender_vocabulary_id",
        "Gender",
        "gender_concept_id",
        Some("gender_source_concept_id"),
        false,
    ),
];

const DEATH_CONCEPTS: &[ConceptColumn] = &[concept(
    "cause_source_value",
    VOCABULARY_ID,
    "ICD10CM",
    "cause_concept_id",
    Some("cause_source_concept_id"),
    false,
)];

const VISIT_CONCEPTS: &[ConceptColumn] = &[concept(
    "visit_source_value",
    VOCABULARY_ID,
    "Visit",
    "visit_concept_id",
    Some("visit_source_concept_id"),
    true,
)];

const CONDITION_CONCEPTS: &[ConceptColumn] = &[concept(
    "condition_source_value",
    VOCABULARY_ID,
    "ICD10CM",
    "condition_concept_id",
    Some("condition_source_concept_id"),
    true,
)];

const PROCEDURE_CONCEPTS: &[ConceptColumn] = &[concept(
    "procedure_source_value",
    VOCABULARY_ID,
    "ICD10PCS",
    "procedure_concept_id",
    Some("procedure_source_concept_id"),
    true,
)];

const DRUG_CONCEPTS: &[ConceptColumn] = &[
    concept(
        "drug_source_value",
        VOCABULARY_ID,
        "RxNorm",
        "drug_concept_id",
        Some("drug_source_concept_id"),
        true,
    ),
    concept(
        "route_source_value",
        "route_vocabulary_id",
        "SNOMED",
        "route_concept_id",
        None,
        false,
    ),
];

const MEASUREMENT_CONCEPTS: &[ConceptColumn] = &[
    concept(
        "measurement_source_value",
        VOCABULARY_ID,
        "LOINC",
        "measurement_concept_id",
        Some("measurement_source_concept_id"),
        true,
    ),
    concept(
        "unit_source_value",
        "unit_vocabulary_id",
        "UCUM",
        "unit_concept_id",
        Some("unit_source_concept_id"),
        false,
    ),
];

const ROLES: [TableRoles; 9] = [
    TableRoles {
        table: OmopTable::Person,
        start: Some("birth_datetime"),
        end: None,
        end_required: false,
        type_concept: None,
        concepts: PERSON_CONCEPTS,
    },
    TableRoles {
        table: OmopTable::Provider,
        start: None,
        end: None,
        end_required: false,
        type_concept: None,
        concepts: PROVIDER_CONCEPTS,
    },
    TableRoles {
        table: OmopTable::ObservationPeriod,
        start: Some("observation_period_start_date"),
        end: Some("observation_period_end_date"),
        end_required: true,
        type_concept: Some("period_type_concept_id"),
        concepts: &[],
    },
    TableRoles {
        table: OmopTable::Death,
        start: Some("death_date"),
        end: None,
        end_required: false,
        type_concept: Some("death_type_concept_id"),
        concepts: DEATH_CONCEPTS,
    },
    TableRoles {
        table: OmopTable::VisitOccurrence,
        start: Some("visit_start_date"),
        end: Some("visit_end_date"),
        end_required: true,
        type_concept: Some("visit_type_concept_id"),
        concepts: VISIT_CONCEPTS,
    },
    TableRoles {
        table: OmopTable::ConditionOccurrence,
        start: Some("condition_start_date"),
        end: Some("condition_end_date"),
        end_required: false,
        type_concept: Some("condition_type_concept_id"),
        concepts: CONDITION_CONCEPTS,
    },
    TableRoles {
        table: OmopTable::ProcedureOccurrence,
        start: Some("procedure_date"),
        end: Some("procedure_end_date"),
        end_required: false,
        type_concept: Some("procedure_type_concept_id"),
        concepts: PROCEDURE_CONCEPTS,
    },
    TableRoles {
        table: OmopTable::DrugExposure,
        start: Some("drug_exposure_start_date"),
        end: Some("drug_exposure_end_date"),
        end_required: true,
        type_concept: Some("drug_type_concept_id"),
        concepts: DRUG_CONCEPTS,
    },
    TableRoles {
        table: OmopTable::Measurement,
        start: Some("measurement_date"),
        end: None,
        end_required: false,
        type_concept: Some("measurement_type_concept_id"),
        concepts: MEASUREMENT_CONCEPTS,
    },
];

pub fn roles_for(table: OmopTable) -> &'static TableRoles {
    let idx = OmopTable::ALL
        .iter()
        .position(|candidate| *candidate == table)
        .unwrap_or_default();
    &ROLES[idx]
}
