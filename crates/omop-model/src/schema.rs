//! OMOP CDM 5.4 column definitions for the supported tables.
//!
//! Each table lists its columns in CDM order with the logical type and
//! whether the column is required (not null). Emitted tables always carry
//! exactly these columns in this order.

use serde::Serialize;

use crate::table::OmopTable;

/// Logical column type in the CDM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    Text,
    Date,
    Datetime,
}

/// One column of a CDM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

/// Column layout of one CDM table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TableSchema {
    pub table: OmopTable,
    pub fields: &'static [FieldSpec],
    /// Surrogate key assigned at emission, if the table has one.
    pub primary_key: Option<&'static str>,
}

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> + '_ {
        self.fields.iter().filter(|field| field.required)
    }
}

const fn req(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        required: true,
    }
}

const fn opt(name: &'static str, field_type: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        required: false,
    }
}

use FieldType::{Date, Datetime, Float, Integer, Text};

const PERSON: &[FieldSpec] = &[
    req("person_id", Integer),
    req("gender_concept_id", Integer),
    req("year_of_birth", Integer),
    opt("month_of_birth", Integer),
    opt("day_of_birth", Integer),
    opt("birth_datetime", Datetime),
    req("race_concept_id", Integer),
    req("ethnicity_concept_id", Integer),
    opt("location_id", Integer),
    opt("provider_id", Integer),
    opt("care_site_id", Integer),
    opt("person_source_value", Text),
    opt("gender_source_value", Text),
    opt("gender_source_concept_id", Integer),
    opt("race_source_value", Text),
    opt("race_source_concept_id", Integer),
    opt("ethnicity_source_value", Text),
    opt("ethnicity_source_concept_id", Integer),
];

const PROVIDER: &[FieldSpec] = &[
    req("provider_id", Integer),
    opt("provider_name", Text),
    opt("npi", Text),
    opt("dea", Text),
    opt("specialty_concept_id", Integer),
    opt("care_site_id", Integer),
    opt("year_of_birth", Integer),
    opt("gender_concept_id", Integer),
    opt("provider_source_value", Text),
    opt("specialty_source_value", Text),
    opt("specialty_source_concept_id", Integer),
    opt("gender_source_value", Text),
    opt("gender_source_concept_id", Integer),
];

const OBSERVATION_PERIOD: &[FieldSpec] = &[
    req("observation_period_id", Integer),
    req("person_id", Integer),
    req("observation_period_start_date", Date),
    req("observation_period_end_date", Date),
    req("period_type_concept_id", Integer),
];

const DEATH: &[FieldSpec] = &[
    req("person_id", Integer),
    req("death_date", Date),
    opt("death_datetime", Datetime),
    opt("death_type_concept_id", Integer),
    opt("cause_concept_id", Integer),
    opt("cause_source_value", Text),
    opt("cause_source_concept_id", Integer),
];

const VISIT_OCCURRENCE: &[FieldSpec] = &[
    req("visit_occurrence_id", Integer),
    req("person_id", Integer),
    req("visit_concept_id", Integer),
    req("visit_start_date", Date),
    opt("visit_start_datetime", Datetime),
    req("visit_end_date", Date),
    opt("visit_end_datetime", Datetime),
    req("visit_type_concept_id", Integer),
    opt("provider_id", Integer),
    opt("care_site_id", Integer),
    opt("visit_source_value", Text),
    opt("visit_source_concept_id", Integer),
    opt("admitted_from_concept_id", Integer),
    opt("admitted_from_source_value", Text),
    opt("discharged_to_concept_id", Integer),
    opt("discharged_to_source_value", Text),
    opt("preceding_visit_occurrence_id", Integer),
];

const CONDITION_OCCURRENCE: &[FieldSpec] = &[
    req("condition_occurrence_id", Integer),
    req("person_id", Integer),
    req("condition_concept_id", Integer),
    req("condition_start_date", Date),
    opt("condition_start_datetime", Datetime),
    opt("condition_end_date", Date),
    opt("condition_end_datetime", Datetime),
    req("condition_type_concept_id", Integer),
    opt("condition_status_concept_id", Integer),
    opt("stop_reason", Text),
    opt("provider_id", Integer),
    opt("visit_occurrence_id", Integer),
    opt("visit_detail_id", Integer),
    opt("condition_source_value", Text),
    opt("condition_source_concept_id", Integer),
    opt("condition_status_source_value", Text),
];

const PROCEDURE_OCCURRENCE: &[FieldSpec] = &[
    req("procedure_occurrence_id", Integer),
    req("person_id", Integer),
    req("procedure_concept_id", Integer),
    req("procedure_date", Date),
    opt("procedure_datetime", Datetime),
    opt("procedure_end_date", Date),
    opt("procedure_end_datetime", Datetime),
    req("procedure_type_concept_id", Integer),
    opt("modifier_concept_id", Integer),
    opt("quantity", Integer),
    opt("provider_id", Integer),
    opt("visit_occurrence_id", Integer),
    opt("visit_detail_id", Integer),
    opt("procedure_source_value", Text),
    opt("procedure_source_concept_id", Integer),
    opt("modifier_source_value", Text),
];

const DRUG_EXPOSURE: &[FieldSpec] = &[
    req("drug_exposure_id", Integer),
    req("person_id", Integer),
    req("drug_concept_id", Integer),
    req("drug_exposure_start_date", Date),
    opt("drug_exposure_start_datetime", Datetime),
    req("drug_exposure_end_date", Date),
    opt("drug_exposure_end_datetime", Datetime),
    opt("verbatim_end_date", Date),
    req("drug_type_concept_id", Integer),
    opt("stop_reason", Text),
    opt("refills", Integer),
    opt("quantity", Float),
    opt("days_supply", Integer),
    opt("sig", Text),
    opt("route_concept_id", Integer),
    opt("lot_number", Text),
    opt("provider_id", Integer),
    opt("visit_occurrence_id", Integer),
    opt("visit_detail_id", Integer),
    opt("drug_source_value", Text),
    opt("drug_source_concept_id", Integer),
    opt("route_source_value", Text),
    opt("dose_unit_source_value", Text),
];

const MEASUREMENT: &[FieldSpec] = &[
    req("measurement_id", Integer),
    req("person_id", Integer),
    req("measurement_concept_id", Integer),
    req("measurement_date", Date),
    opt("measurement_datetime", Datetime),
    opt("measurement_time", Text),
    req("measurement_type_concept_id", Integer),
    opt("operator_concept_id", Integer),
    opt("value_as_number", Float),
    opt("value_as_concept_id", Integer),
    opt("unit_concept_id", Integer),
    opt("range_low", Float),
    opt("range_high", Float),
    opt("provider_id", Integer),
    opt("visit_occurrence_id", Integer),
    opt("visit_detail_id", Integer),
    opt("measurement_source_value", Text),
    opt("measurement_source_concept_id", Integer),
    opt("unit_source_value", Text),
    opt("unit_source_concept_id", Integer),
    opt("value_source_value", Text),
    opt("measurement_event_id", Integer),
    opt("meas_event_field_concept_id", Integer),
];

const SCHEMAS: [TableSchema; 9] = [
    TableSchema {
        table: OmopTable::Person,
        fields: PERSON,
        primary_key: None,
    },
    TableSchema {
        table: OmopTable::Provider,
        fields: PROVIDER,
        primary_key: Some("provider_id"),
    },
    TableSchema {
        table: OmopTable::ObservationPeriod,
        fields: OBSERVATION_PERIOD,
        primary_key: Some("observation_period_id"),
    },
    TableSchema {
        table: OmopTable::Death,
        fields: DEATH,
        primary_key: None,
    },
    TableSchema {
        table: OmopTable::VisitOccurrence,
        fields: VISIT_OCCURRENCE,
        primary_key: Some("visit_occurrence_id"),
    },
    TableSchema {
        table: OmopTable::ConditionOccurrence,
        fields: CONDITION_OCCURRENCE,
        primary_key: Some("condition_occurrence_id"),
    },
    TableSchema {
        table: OmopTable::ProcedureOccurrence,
        fields: PROCEDURE_OCCURRENCE,
        primary_key: Some("procedure_occurrence_id"),
    },
    TableSchema {
        table: OmopTable::DrugExposure,
        fields: DRUG_EXPOSURE,
        primary_key: Some("drug_exposure_id"),
    },
    TableSchema {
        table: OmopTable::Measurement,
        fields: MEASUREMENT,
        primary_key: Some("measurement_id"),
    },
];

/// Schema of a supported table.
pub fn schema_for(table: OmopTable) -> &'static TableSchema {
    let idx = OmopTable::ALL
        .iter()
        .position(|candidate| *candidate == table)
        .unwrap_or_default();
    &SCHEMAS[idx]
}
