//! OBSERVATION_PERIOD: spans of continuous observation per person.

use polars::prelude::DataFrame;

use omop_model::{OmopTable, Result, TableIssue};

use super::DomainProcessor;
use super::common::aggregate_episodes;
use crate::context::ProcessingContext;

pub(super) struct ObservationPeriodProcessor;

impl DomainProcessor for ObservationPeriodProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::ObservationPeriod
    }

    fn description(&self) -> &'static str {
        "Observation spans grouped per person within the date window"
    }

    fn aggregate(
        &self,
        df: DataFrame,
        ctx: &ProcessingContext<'_>,
        _issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        aggregate_episodes(df, &[], ctx)
    }
}
