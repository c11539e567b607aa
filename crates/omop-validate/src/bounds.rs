use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use omop_model::ObservationPeriod;

/// Known persons and their temporal bounds, taken from PERSON, DEATH and
/// OBSERVATION_PERIOD.
///
/// Each source is optional: when a reference table was not produced, the
/// checks depending on it are skipped instead of rejecting every row.
#[derive(Debug, Clone, Default)]
pub struct PersonBounds {
    persons: Option<HashSet<i64>>,
    birth_dates: Option<HashMap<i64, NaiveDate>>,
    death_dates: Option<HashMap<i64, NaiveDate>>,
    periods: Option<HashMap<i64, Vec<ObservationPeriod>>>,
}

impl PersonBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persons emitted in PERSON; any other `person_id` is unknown.
    #[must_use]
    pub fn with_persons(mut self, persons: impl IntoIterator<Item = i64>) -> Self {
        self.persons = Some(persons.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_birth_dates(mut self, dates: impl IntoIterator<Item = (i64, NaiveDate)>) -> Self {
        self.birth_dates = Some(dates.into_iter().collect());
        self
    }

    /// Death dates; the earliest date wins when a person has several.
    #[must_use]
    pub fn with_death_dates(mut self, dates: impl IntoIterator<Item = (i64, NaiveDate)>) -> Self {
        let mut map: HashMap<i64, NaiveDate> = HashMap::new();
        for (person, date) in dates {
            map.entry(person)
                .and_modify(|current| *current = (*current).min(date))
                .or_insert(date);
        }
        self.death_dates = Some(map);
        self
    }

    #[must_use]
    pub fn with_observation_periods(
        mut self,
        periods: impl IntoIterator<Item = ObservationPeriod>,
    ) -> Self {
        let mut map: HashMap<i64, Vec<ObservationPeriod>> = HashMap::new();
        for period in periods {
            map.entry(period.person_id).or_default().push(period);
        }
        for list in map.values_mut() {
            list.sort_by_key(|period| (period.start, period.end));
        }
        self.periods = Some(map);
        self
    }

    pub fn has_persons(&self) -> bool {
        self.persons.is_some()
    }

    /// `false` only when PERSON is known and lacks the person.
    pub fn is_known(&self, person_id: i64) -> bool {
        self.persons
            .as_ref()
            .is_none_or(|persons| persons.contains(&person_id))
    }

    pub fn has_birth_dates(&self) -> bool {
        self.birth_dates.is_some()
    }

    pub fn has_death_dates(&self) -> bool {
        self.death_dates.is_some()
    }

    pub fn has_observation_periods(&self) -> bool {
        self.periods.is_some()
    }

    pub fn birth_date(&self, person_id: i64) -> Option<NaiveDate> {
        self.birth_dates.as_ref()?.get(&person_id).copied()
    }

    pub fn death_date(&self, person_id: i64) -> Option<NaiveDate> {
        self.death_dates.as_ref()?.get(&person_id).copied()
    }

    /// The person's observation periods; `None` when periods are unknown.
    pub fn periods(&self, person_id: i64) -> Option<&[ObservationPeriod]> {
        let periods = self.periods.as_ref()?;
        Some(periods.get(&person_id).map(Vec::as_slice).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn earliest_death_date_wins() {
        let bounds = PersonBounds::new()
            .with_death_dates([(1, d("2021-05-01")), (1, d("2021-04-01"))]);
        assert_eq!(bounds.death_date(1), Some(d("2021-04-01")));
        assert_eq!(bounds.death_date(2), None);
    }

    #[test]
    fn persons_are_known_until_person_is_loaded() {
        assert!(PersonBounds::new().is_known(99));
        let bounds = PersonBounds::new().with_persons([1, 2]);
        assert!(bounds.is_known(2));
        assert!(!bounds.is_known(99));
    }

    #[test]
    fn unknown_periods_differ_from_no_periods() {
        assert!(PersonBounds::new().periods(1).is_none());
        let bounds = PersonBounds::new().with_observation_periods([]);
        assert_eq!(bounds.periods(1).map(<[_]>::len), Some(0));
    }
}
