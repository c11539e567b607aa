//! CONDITION_OCCURRENCE: diagnoses of the same code grouped into episodes.

use polars::prelude::DataFrame;

use omop_model::{OmopTable, Result, TableIssue};

use super::DomainProcessor;
use super::common::aggregate_episodes;
use crate::context::ProcessingContext;

pub(super) struct ConditionProcessor;

impl DomainProcessor for ConditionProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::ConditionOccurrence
    }

    fn description(&self) -> &'static str {
        "Diagnoses grouped into episodes per concept"
    }

    fn aggregate(
        &self,
        df: DataFrame,
        ctx: &ProcessingContext<'_>,
        _issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        aggregate_episodes(
            df,
            &["condition_concept_id", "condition_source_value"],
            ctx,
        )
    }
}
