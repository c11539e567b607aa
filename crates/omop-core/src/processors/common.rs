//! Aggregation and linkage helpers shared by the event processors.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tracing::{debug, warn};

use omop_model::roles::{
    END_DATE, PERSON_ID, PROVIDER_ID, PROVIDER_SOURCE_VALUE, START_DATE, TYPE_CONCEPT,
    VISIT_OCCURRENCE_ID,
};
use omop_model::{IssueKind, Result, TableIssue};
use omop_transform::frame::{
    date_column, i64_column, optional_i64_column, optional_text_column, set_dates, set_i64,
    take_rows,
};
use omop_transform::{DatedRecord, group_dates};

use crate::context::ProcessingContext;

/// Group repeated records of a person sharing the values of `key_columns`.
///
/// Each episode keeps the columns of its earliest member, spans the earliest
/// start to the latest end, and carries the voted type concept. Rows that
/// cannot be dated (no person, no start, or end before start) pass through
/// unchanged for validation to judge.
pub(super) fn aggregate_episodes(
    df: DataFrame,
    key_columns: &[&str],
    ctx: &ProcessingContext<'_>,
) -> Result<DataFrame> {
    let params = ctx.params;
    let persons = i64_column(&df, PERSON_ID)?;
    let starts = date_column(&df, START_DATE)?.values;
    let ends = date_column(&df, END_DATE)?.values;
    let types = optional_i64_column(&df, TYPE_CONCEPT)?;
    let keys = key_columns
        .iter()
        .map(|column| optional_text_column(&df, column))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::with_capacity(df.height());
    let mut source_rows = Vec::with_capacity(df.height());
    let mut passthrough = Vec::new();
    for idx in 0..df.height() {
        match (persons[idx], starts[idx]) {
            (Some(person), Some(start)) if ends[idx].is_none_or(|end| end >= start) => {
                let key: Vec<Option<String>> = keys.iter().map(|col| col[idx].clone()).collect();
                records.push(DatedRecord {
                    key: (person, key),
                    start,
                    end: ends[idx].unwrap_or(start),
                    value: types[idx],
                });
                source_rows.push(idx);
            }
            _ => passthrough.push(idx),
        }
    }

    let grouped = group_dates(&records, params.group_window_days, params.tie_break);
    let mut rows = Vec::with_capacity(grouped.records.len() + passthrough.len());
    let mut out_starts = Vec::with_capacity(rows.capacity());
    let mut out_ends = Vec::with_capacity(rows.capacity());
    let mut out_types = Vec::with_capacity(rows.capacity());
    for (record, episode) in grouped.records.iter().zip(&grouped.episodes) {
        rows.push(source_rows[episode.first]);
        let dated_end = episode
            .members
            .iter()
            .any(|&member| ends[source_rows[member]].is_some());
        out_starts.push(Some(record.start));
        out_ends.push(dated_end.then_some(record.end));
        out_types.push(record.value);
    }
    for idx in passthrough {
        rows.push(idx);
        out_starts.push(starts[idx]);
        out_ends.push(ends[idx]);
        out_types.push(types[idx]);
    }
    debug!(
        table = %params.table,
        records = records.len(),
        episodes = grouped.records.len(),
        "grouped records"
    );

    let mut out = take_rows(&df, &rows)?;
    set_dates(&mut out, START_DATE, &out_starts)?;
    set_dates(&mut out, END_DATE, &out_ends)?;
    set_i64(&mut out, TYPE_CONCEPT, out_types)?;
    Ok(out)
}

/// Fill `visit_occurrence_id` from the emitted visits, when available.
pub(crate) fn link_visits(df: &mut DataFrame, ctx: &ProcessingContext<'_>) -> Result<()> {
    let Some(index) = ctx.reference.visits() else {
        debug!(table = %ctx.params.table, "no visits available for linkage");
        return Ok(());
    };
    let persons = i64_column(df, PERSON_ID)?;
    let starts = date_column(df, START_DATE)?.values;
    let ids: Vec<Option<i64>> = persons
        .iter()
        .zip(&starts)
        .map(|(person, start)| index.find((*person)?, (*start)?))
        .collect();
    let linked = ids.iter().filter(|id| id.is_some()).count();
    debug!(table = %ctx.params.table, linked, rows = ids.len(), "linked events to visits");
    set_i64(df, VISIT_OCCURRENCE_ID, ids)
}

/// Fill a null `provider_id` from `provider_source_value` through the
/// emitted PROVIDER table.
pub(crate) fn link_providers(
    df: &mut DataFrame,
    ctx: &ProcessingContext<'_>,
    issues: &mut Vec<TableIssue>,
) -> Result<()> {
    let table = ctx.params.table;
    let codes = optional_text_column(df, PROVIDER_SOURCE_VALUE)?;
    let pending = codes.iter().filter(|code| code.is_some()).count();
    if pending == 0 {
        return Ok(());
    }
    let Some(providers) = ctx.reference.providers() else {
        warn!(table = %table, rows = pending, "no PROVIDER table, provider codes ignored");
        issues.push(
            TableIssue::new(
                IssueKind::Skipped,
                "provider lookup skipped: no PROVIDER table available",
            )
            .with_column(PROVIDER_ID)
            .with_count(pending),
        );
        return Ok(());
    };

    let mut ids = optional_i64_column(df, PROVIDER_ID)?;
    let mut unknown: BTreeMap<&str, usize> = BTreeMap::new();
    for (id, code) in ids.iter_mut().zip(&codes) {
        let Some(code) = code.as_deref() else {
            continue;
        };
        match providers.get(code) {
            Some(provider_id) => {
                id.get_or_insert(*provider_id);
            }
            None => *unknown.entry(code).or_default() += 1,
        }
    }
    if !unknown.is_empty() {
        let rows: usize = unknown.values().sum();
        for (code, count) in &unknown {
            debug!(target: "omop::data", table = %table, code, count, "unknown provider code");
        }
        issues.push(
            TableIssue::new(
                IssueKind::MappingGap,
                format!("{} provider source values have no PROVIDER row", unknown.len()),
            )
            .with_column(PROVIDER_ID)
            .with_count(rows),
        );
    }
    debug!(table = %table, rows = pending - unknown.values().sum::<usize>(), "linked providers");
    set_i64(df, PROVIDER_ID, ids)
}
