//! Read-only reference data shared by the transformers of later waves.

use std::collections::HashMap;

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use omop_model::roles::PROVIDER_SOURCE_VALUE;
use omop_model::{ObservationPeriod, Result};
use omop_transform::frame::{date_column, has_column, i64_column, text_column};
use omop_transform::{VisitIndex, VisitSpan};
use omop_validate::PersonBounds;

/// Persons with their birth dates, death dates and observation periods,
/// providers by source code, and visits of emitted tables.
///
/// Each part is filled in once the table it comes from has been emitted; a
/// missing part leaves the dependent checks and lookups disabled.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    bounds: PersonBounds,
    providers: Option<HashMap<String, i64>>,
    visits: Option<VisitIndex>,
}

impl ReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known persons and birth dates from the emitted PERSON table.
    pub fn with_persons(mut self, person: &DataFrame) -> Result<Self> {
        let ids: Vec<i64> = i64_column(person, "person_id")?.into_iter().flatten().collect();
        let births = dated_persons(person, "birth_datetime")?;
        self.bounds = std::mem::take(&mut self.bounds)
            .with_persons(ids)
            .with_birth_dates(births);
        Ok(self)
    }

    /// `provider_source_value` to `provider_id` from the emitted PROVIDER table.
    pub fn with_providers(mut self, provider: &DataFrame) -> Result<Self> {
        let ids = i64_column(provider, "provider_id")?;
        let codes = text_column(provider, PROVIDER_SOURCE_VALUE)?;
        let map = codes
            .into_iter()
            .zip(ids)
            .filter_map(|(code, id)| Some((code?, id?)))
            .collect();
        self.providers = Some(map);
        Ok(self)
    }

    pub fn with_deaths(mut self, death: &DataFrame) -> Result<Self> {
        let dates = dated_persons(death, "death_date")?;
        self.bounds = std::mem::take(&mut self.bounds).with_death_dates(dates);
        Ok(self)
    }

    pub fn with_observation_periods(mut self, observation_period: &DataFrame) -> Result<Self> {
        let df = observation_period;
        let persons = i64_column(df, "person_id")?;
        let starts = date_column(df, "observation_period_start_date")?.values;
        let ends = date_column(df, "observation_period_end_date")?.values;
        let periods = persons
            .into_iter()
            .zip(starts)
            .zip(ends)
            .filter_map(|((person, start), end)| {
                Some(ObservationPeriod {
                    person_id: person?,
                    start: start?,
                    end: end?,
                })
            });
        self.bounds = std::mem::take(&mut self.bounds).with_observation_periods(periods);
        Ok(self)
    }

    /// Attach the emitted VISIT_OCCURRENCE table for event linkage.
    pub fn with_visits(mut self, visits: &DataFrame) -> Result<Self> {
        let ids = i64_column(visits, "visit_occurrence_id")?;
        let persons = i64_column(visits, "person_id")?;
        let starts = date_column(visits, "visit_start_date")?.values;
        let ends = date_column(visits, "visit_end_date")?.values;
        let spans = (0..visits.height()).filter_map(|idx| {
            Some(VisitSpan {
                visit_occurrence_id: ids[idx]?,
                person_id: persons[idx]?,
                start: starts[idx]?,
                end: ends[idx].or(starts[idx])?,
            })
        });
        self.visits = Some(VisitIndex::new(spans));
        Ok(self)
    }

    pub fn bounds(&self) -> &PersonBounds {
        &self.bounds
    }

    pub fn providers(&self) -> Option<&HashMap<String, i64>> {
        self.providers.as_ref()
    }

    pub fn visits(&self) -> Option<&VisitIndex> {
        self.visits.as_ref()
    }
}

fn dated_persons(df: &DataFrame, date_column_name: &str) -> Result<Vec<(i64, NaiveDate)>> {
    if !has_column(df, date_column_name) {
        return Ok(Vec::new());
    }
    let persons = i64_column(df, "person_id")?;
    let dates = date_column(df, date_column_name)?.values;
    Ok(persons
        .into_iter()
        .zip(dates)
        .filter_map(|(person, date)| Some((person?, date?)))
        .collect())
}
