use std::fmt;

use serde::Serialize;

/// Column added to rejected rows naming the first rule they failed.
pub const REJECTION_REASON: &str = "rejection_reason";

/// Row-level invariants, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MissingPerson,
    UnknownPerson,
    MissingStartDate,
    EndBeforeStart,
    BeforeBirth,
    NoObservationPeriod,
    OutsideObservationPeriod,
    AfterDeath,
    DuplicatePerson,
}

impl Rule {
    pub const ALL: [Rule; 9] = [
        Rule::MissingPerson,
        Rule::UnknownPerson,
        Rule::MissingStartDate,
        Rule::EndBeforeStart,
        Rule::BeforeBirth,
        Rule::NoObservationPeriod,
        Rule::OutsideObservationPeriod,
        Rule::AfterDeath,
        Rule::DuplicatePerson,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rule::MissingPerson => "missing_person",
            Rule::UnknownPerson => "unknown_person",
            Rule::MissingStartDate => "missing_start_date",
            Rule::EndBeforeStart => "end_before_start",
            Rule::BeforeBirth => "before_birth",
            Rule::NoObservationPeriod => "no_observation_period",
            Rule::OutsideObservationPeriod => "outside_observation_period",
            Rule::AfterDeath => "after_death",
            Rule::DuplicatePerson => "duplicate_person",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Rule::MissingPerson => "person_id is null",
            Rule::UnknownPerson => "person_id has no PERSON row",
            Rule::MissingStartDate => "event date is null",
            Rule::EndBeforeStart => "end date precedes start date",
            Rule::BeforeBirth => "event date precedes birth",
            Rule::NoObservationPeriod => "person has no observation period",
            Rule::OutsideObservationPeriod => "event date outside every observation period",
            Rule::AfterDeath => "event ends after death plus grace window",
            Rule::DuplicatePerson => "person already has a row",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
