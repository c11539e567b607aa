//! DRUG_EXPOSURE: exposures grouped per drug and route.

use polars::prelude::DataFrame;

use omop_model::{OmopTable, Result, TableIssue};

use super::DomainProcessor;
use super::common::aggregate_episodes;
use crate::context::ProcessingContext;

pub(super) struct DrugProcessor;

impl DomainProcessor for DrugProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::DrugExposure
    }

    fn description(&self) -> &'static str {
        "Drug exposures grouped per concept and route"
    }

    /// The same drug given by another route is a separate exposure.
    fn aggregate(
        &self,
        df: DataFrame,
        ctx: &ProcessingContext<'_>,
        _issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        aggregate_episodes(
            df,
            &["drug_concept_id", "drug_source_value", "route_concept_id"],
            ctx,
        )
    }
}
