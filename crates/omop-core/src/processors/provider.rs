//! PROVIDER: one row per provider source code with specialty concepts.

use std::collections::HashSet;

use polars::prelude::DataFrame;
use tracing::debug;

use omop_model::roles::PROVIDER_SOURCE_VALUE;
use omop_model::{IssueKind, OmopTable, Result, TableIssue};
use omop_transform::frame::{optional_text_column, take_rows};

use super::DomainProcessor;
use crate::context::ProcessingContext;

pub(super) struct ProviderProcessor;

impl DomainProcessor for ProviderProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::Provider
    }

    fn description(&self) -> &'static str {
        "Providers keyed by source code, specialty mapped"
    }

    /// Keeps the first row of each provider source code so the code
    /// identifies one `provider_id`. Rows without a code pass through.
    fn aggregate(
        &self,
        df: DataFrame,
        _ctx: &ProcessingContext<'_>,
        issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        let codes = optional_text_column(&df, PROVIDER_SOURCE_VALUE)?;
        let mut seen = HashSet::new();
        let keep: Vec<usize> = codes
            .iter()
            .enumerate()
            .filter(|(_, code)| code.as_deref().is_none_or(|code| seen.insert(code)))
            .map(|(idx, _)| idx)
            .collect();
        let dropped = df.height() - keep.len();
        if dropped == 0 {
            return Ok(df);
        }
        debug!(dropped, "dropped repeated provider codes");
        issues.push(
            TableIssue::new(IssueKind::Repaired, "repeated provider source values dropped")
                .with_column(PROVIDER_SOURCE_VALUE)
                .with_count(dropped),
        );
        take_rows(&df, &keep)
    }
}
