//! DEATH: at most one record per person.

use std::collections::HashSet;

use polars::prelude::DataFrame;
use tracing::debug;

use omop_model::roles::{PERSON_ID, START_DATE};
use omop_model::{IssueKind, OmopTable, Result, TableIssue};
use omop_transform::frame::{date_column, i64_column, take_rows};

use super::DomainProcessor;
use crate::context::ProcessingContext;

pub(super) struct DeathProcessor;

impl DomainProcessor for DeathProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::Death
    }

    fn description(&self) -> &'static str {
        "Earliest death record per person with cause concept"
    }

    /// Keeps the earliest dated record of each person; undated records are
    /// left for validation.
    fn aggregate(
        &self,
        df: DataFrame,
        _ctx: &ProcessingContext<'_>,
        issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        let persons = i64_column(&df, PERSON_ID)?;
        let dates = date_column(&df, START_DATE)?.values;
        let mut order: Vec<usize> = (0..df.height()).collect();
        order.sort_by_key(|&idx| (persons[idx], dates[idx].is_none(), dates[idx], idx));

        let mut seen = HashSet::new();
        let mut keep = Vec::with_capacity(order.len());
        for idx in order {
            let dated_person = persons[idx].filter(|_| dates[idx].is_some());
            match dated_person {
                Some(person) if !seen.insert(person) => {}
                _ => keep.push(idx),
            }
        }
        let dropped = df.height() - keep.len();
        if dropped > 0 {
            debug!(dropped, "dropped later death records");
            issues.push(
                TableIssue::new(IssueKind::Repaired, "later death records of a person dropped")
                    .with_count(dropped),
            );
        }
        take_rows(&df, &keep)
    }
}
