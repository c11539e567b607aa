//! VISIT_OCCURRENCE: reconciliation of overlapping encounters.

use polars::prelude::DataFrame;
use tracing::debug;

use omop_model::roles::{END_DATE, PERSON_ID, PROVIDER_ID, START_DATE};
use omop_model::{Interval, OmopTable, Result, TableIssue};
use omop_transform::frame::{
    date_column, i64_column, optional_i64_column, set_dates, set_i64, take_rows,
};
use omop_transform::reconcile_intervals;

use super::DomainProcessor;
use crate::context::ProcessingContext;

pub(super) struct VisitProcessor;

impl DomainProcessor for VisitProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::VisitOccurrence
    }

    fn description(&self) -> &'static str {
        "Encounters with overlapping multi-day stays merged"
    }

    fn aggregate(
        &self,
        df: DataFrame,
        ctx: &ProcessingContext<'_>,
        _issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        let persons = i64_column(&df, PERSON_ID)?;
        let starts = date_column(&df, START_DATE)?.values;
        let ends = date_column(&df, END_DATE)?.values;
        let providers = optional_i64_column(&df, PROVIDER_ID)?;

        let mut intervals = Vec::with_capacity(df.height());
        let mut passthrough = Vec::new();
        for idx in 0..df.height() {
            let interval = persons[idx].zip(starts[idx]).and_then(|(person, start)| {
                Interval::new(person, start, ends[idx].unwrap_or(start), providers[idx], idx)
            });
            match interval {
                Some(interval) => intervals.push(interval),
                None => passthrough.push(idx),
            }
        }

        let reconciled = reconcile_intervals(intervals);
        debug!(
            table = %ctx.params.table,
            merged = reconciled.merged,
            provider_conflicts = reconciled.provider_conflicts,
            "reconciled visits"
        );

        let mut rows = Vec::with_capacity(reconciled.intervals.len() + passthrough.len());
        let mut out_starts = Vec::with_capacity(rows.capacity());
        let mut out_ends = Vec::with_capacity(rows.capacity());
        let mut out_providers = Vec::with_capacity(rows.capacity());
        for interval in &reconciled.intervals {
            rows.push(interval.payload);
            out_starts.push(Some(interval.start));
            out_ends.push(Some(interval.end));
            out_providers.push(interval.provider_id);
        }
        for idx in passthrough {
            rows.push(idx);
            out_starts.push(starts[idx]);
            out_ends.push(ends[idx]);
            out_providers.push(providers[idx]);
        }

        let mut out = take_rows(&df, &rows)?;
        set_dates(&mut out, START_DATE, &out_starts)?;
        set_dates(&mut out, END_DATE, &out_ends)?;
        set_i64(&mut out, PROVIDER_ID, out_providers)?;
        Ok(out)
    }
}
