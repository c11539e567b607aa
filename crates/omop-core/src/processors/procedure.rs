//! PROCEDURE_OCCURRENCE: repeated procedures of the same code collapsed.

use polars::prelude::DataFrame;

use omop_model::{OmopTable, Result, TableIssue};

use super::DomainProcessor;
use super::common::aggregate_episodes;
use crate::context::ProcessingContext;

pub(super) struct ProcedureProcessor;

impl DomainProcessor for ProcedureProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::ProcedureOccurrence
    }

    fn description(&self) -> &'static str {
        "Procedures grouped per concept within the date window"
    }

    fn aggregate(
        &self,
        df: DataFrame,
        ctx: &ProcessingContext<'_>,
        _issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        aggregate_episodes(
            df,
            &["procedure_concept_id", "procedure_source_value"],
            ctx,
        )
    }
}
