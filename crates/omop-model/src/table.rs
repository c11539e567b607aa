//! Target OMOP CDM tables handled by the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A target table of the OMOP Common Data Model (v5.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmopTable {
    Person,
    Provider,
    ObservationPeriod,
    Death,
    VisitOccurrence,
    ConditionOccurrence,
    ProcedureOccurrence,
    DrugExposure,
    Measurement,
}

impl OmopTable {
    /// All supported tables in dependency order.
    pub const ALL: [OmopTable; 9] = [
        OmopTable::Person,
        OmopTable::Provider,
        OmopTable::ObservationPeriod,
        OmopTable::Death,
        OmopTable::VisitOccurrence,
        OmopTable::ConditionOccurrence,
        OmopTable::ProcedureOccurrence,
        OmopTable::DrugExposure,
        OmopTable::Measurement,
    ];

    /// Lowercase table name as used for file names and config keys.
    pub fn name(self) -> &'static str {
        match self {
            OmopTable::Person => "person",
            OmopTable::Provider => "provider",
            OmopTable::ObservationPeriod => "observation_period",
            OmopTable::Death => "death",
            OmopTable::VisitOccurrence => "visit_occurrence",
            OmopTable::ConditionOccurrence => "condition_occurrence",
            OmopTable::ProcedureOccurrence => "procedure_occurrence",
            OmopTable::DrugExposure => "drug_exposure",
            OmopTable::Measurement => "measurement",
        }
    }

    /// Uppercase CDM table name (e.g. `VISIT_OCCURRENCE`).
    pub fn cdm_name(self) -> String {
        self.name().to_uppercase()
    }

    pub fn description(self) -> &'static str {
        match self {
            OmopTable::Person => "Demographics, one row per person",
            OmopTable::Provider => "Health care providers and their specialties",
            OmopTable::ObservationPeriod => "Spans of time with complete data capture",
            OmopTable::Death => "Death date and cause",
            OmopTable::VisitOccurrence => "Encounters with the health care system",
            OmopTable::ConditionOccurrence => "Diagnoses and problems",
            OmopTable::ProcedureOccurrence => "Procedures performed",
            OmopTable::DrugExposure => "Drug dispensing and administration",
            OmopTable::Measurement => "Laboratory results and vital signs",
        }
    }

    /// Number of execution waves.
    pub const WAVES: usize = 4;

    /// Execution wave: tables in a later wave read the outputs of earlier ones.
    ///
    /// PERSON and PROVIDER come first, so OBSERVATION_PERIOD and DEATH are
    /// checked against known persons and birth dates.
    pub fn wave(self) -> usize {
        match self {
            OmopTable::Person | OmopTable::Provider => 0,
            OmopTable::ObservationPeriod | OmopTable::Death => 1,
            OmopTable::VisitOccurrence => 2,
            _ => 3,
        }
    }

    /// Tables whose rows belong to a person and carry an event (or birth) date.
    pub fn has_person(self) -> bool {
        self != OmopTable::Provider
    }

    /// Clinical event tables: rows must fall inside an observation period
    /// and must not extend past the person's death (plus grace window).
    pub fn is_clinical(self) -> bool {
        matches!(
            self,
            OmopTable::VisitOccurrence
                | OmopTable::ConditionOccurrence
                | OmopTable::ProcedureOccurrence
                | OmopTable::DrugExposure
                | OmopTable::Measurement
        )
    }

    /// Tables whose `provider_source_value` is resolved against PROVIDER.
    pub fn links_providers(self) -> bool {
        self.is_clinical()
    }

    /// Tables whose events can be linked to a visit occurrence.
    pub fn links_visits(self) -> bool {
        self.is_clinical() && self != OmopTable::VisitOccurrence
    }
}

impl fmt::Display for OmopTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OmopTable {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_lowercase();
        OmopTable::ALL
            .into_iter()
            .find(|table| table.name() == needle)
            .ok_or_else(|| format!("unknown OMOP table `{}`", value.trim()))
    }
}
