use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, TimeDelta};
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use omop_model::roles::{END_DATE, PERSON_ID, START_DATE, TYPE_CONCEPT};
use omop_model::{
    DomainParams, EtlError, IssueKind, OmopTable, QuarantinePolicy, Result, TableIssue,
    TableRoles, roles_for,
};
use omop_transform::frame::{
    date_column, filter_rows, has_column, i64_column, set_dates, set_i64, set_text, take_rows,
};

use crate::bounds::PersonBounds;
use crate::rules::{REJECTION_REASON, Rule};

/// Result of validating one table.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Rows that passed every check.
    pub frame: DataFrame,
    /// Quarantined rows with a `rejection_reason` column, when retained.
    pub rejected: Option<DataFrame>,
    pub quarantined: usize,
    pub issues: Vec<TableIssue>,
}

/// Repair and check an aggregated table.
///
/// Under strict validation the first broken rule (in [`Rule::ALL`] order)
/// aborts with [`EtlError::SchemaViolation`]; otherwise failing rows are
/// removed and one issue per rule is reported.
pub fn validate_table(
    mut df: DataFrame,
    params: &DomainParams,
    bounds: &PersonBounds,
) -> Result<ValidationOutcome> {
    let table = params.table;
    let roles = roles_for(table);
    let mut issues = Vec::new();

    repair_concepts(&mut df, params, roles, &mut issues)?;
    repair_end_dates(&mut df, roles, &mut issues)?;

    if table.has_person() && table != OmopTable::Person && !bounds.has_persons() {
        issues.push(TableIssue::new(
            IssueKind::Skipped,
            "person check skipped: no PERSON table available",
        ));
    }
    if table.is_clinical() && !bounds.has_observation_periods() {
        issues.push(TableIssue::new(
            IssueKind::Skipped,
            "observation period check skipped: no observation periods available",
        ));
    }

    let failures = evaluate(&df, params, bounds)?;
    let mut counts: BTreeMap<Rule, usize> = BTreeMap::new();
    for rule in failures.iter().flatten() {
        *counts.entry(*rule).or_default() += 1;
    }

    if let Some((rule, count)) = counts.iter().next() {
        if params.strict_validation {
            warn!(table = %table, rule = %rule, count, "strict validation failed");
            return Err(EtlError::SchemaViolation {
                table,
                rule: rule.as_str().to_string(),
                count: *count,
            });
        }
    }

    let quarantined: usize = counts.values().sum();
    for (rule, count) in &counts {
        warn!(table = %table, rule = %rule, count, "quarantined rows");
        issues.push(
            TableIssue::new(
                IssueKind::SchemaViolation,
                format!("{rule}: {}", rule.message()),
            )
            .with_count(*count),
        );
    }

    let rejected = if quarantined > 0 && params.quarantine == QuarantinePolicy::Retain {
        let rows: Vec<usize> = failures
            .iter()
            .enumerate()
            .filter_map(|(idx, failure)| failure.map(|_| idx))
            .collect();
        let mut rejected = take_rows(&df, &rows)?;
        let reasons = failures
            .iter()
            .flatten()
            .map(|rule| Some(rule.as_str().to_string()))
            .collect();
        set_text(&mut rejected, REJECTION_REASON, reasons)?;
        Some(rejected)
    } else {
        None
    };

    if quarantined > 0 {
        let keep: Vec<bool> = failures.iter().map(Option::is_none).collect();
        filter_rows(&mut df, &keep)?;
    }
    debug!(table = %table, rows = df.height(), quarantined, "validated");

    Ok(ValidationOutcome {
        frame: df,
        rejected,
        quarantined,
        issues,
    })
}

fn repair_concepts(
    df: &mut DataFrame,
    params: &DomainParams,
    roles: &TableRoles,
    issues: &mut Vec<TableIssue>,
) -> Result<()> {
    let mut targets: Vec<(&str, &str, i64)> = roles
        .concepts
        .iter()
        .filter(|concept| concept.required)
        .map(|concept| (concept.concept_id, concept.concept_id, params.default_concept_id))
        .collect();
    if let Some(type_column) = roles.type_concept {
        targets.push((TYPE_CONCEPT, type_column, params.default_type_concept_id));
    }
    for (column, cdm_column, default) in targets {
        let mut values = if has_column(df, column) {
            i64_column(df, column)?
        } else {
            vec![None; df.height()]
        };
        let repaired = values.iter().filter(|value| value.is_none()).count();
        if repaired == 0 {
            continue;
        }
        for value in &mut values {
            value.get_or_insert(default);
        }
        set_i64(df, column, values)?;
        issues.push(
            TableIssue::new(IssueKind::Repaired, format!("null concept id set to {default}"))
                .with_column(cdm_column)
                .with_count(repaired),
        );
    }
    Ok(())
}

fn repair_end_dates(
    df: &mut DataFrame,
    roles: &TableRoles,
    issues: &mut Vec<TableIssue>,
) -> Result<()> {
    let Some(end_column) = roles.end.filter(|_| roles.end_required) else {
        return Ok(());
    };
    let starts = date_column(df, START_DATE)?.values;
    let mut ends = date_column(df, END_DATE)?.values;
    let mut repaired = 0usize;
    for (end, start) in ends.iter_mut().zip(&starts) {
        if end.is_none() && start.is_some() {
            *end = *start;
            repaired += 1;
        }
    }
    if repaired > 0 {
        set_dates(df, END_DATE, &ends)?;
        issues.push(
            TableIssue::new(IssueKind::Repaired, "missing end date set to start date")
                .with_column(end_column)
                .with_count(repaired),
        );
    }
    Ok(())
}

/// First failing rule per row.
fn evaluate(
    df: &DataFrame,
    params: &DomainParams,
    bounds: &PersonBounds,
) -> Result<Vec<Option<Rule>>> {
    let table = params.table;
    if !table.has_person() {
        return Ok(vec![None; df.height()]);
    }
    let persons = if has_column(df, PERSON_ID) {
        i64_column(df, PERSON_ID)?
    } else {
        vec![None; df.height()]
    };
    let starts = date_column(df, START_DATE)?.values;
    let ends = date_column(df, END_DATE)?.values;
    let grace = TimeDelta::days(params.grace_window_days);
    let unique_person = matches!(table, OmopTable::Person | OmopTable::Death);
    let mut seen = HashSet::new();

    let mut failures = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let failure = check_row(
            table,
            persons[idx],
            starts[idx],
            ends[idx],
            grace,
            bounds,
        )
        .or_else(|| {
            let person = persons[idx]?;
            (unique_person && !seen.insert(person)).then_some(Rule::DuplicatePerson)
        });
        failures.push(failure);
    }
    Ok(failures)
}

fn check_row(
    table: OmopTable,
    person: Option<i64>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    grace: TimeDelta,
    bounds: &PersonBounds,
) -> Option<Rule> {
    let Some(person) = person else {
        return Some(Rule::MissingPerson);
    };
    if table != OmopTable::Person && !bounds.is_known(person) {
        return Some(Rule::UnknownPerson);
    }
    let Some(start) = start else {
        return Some(Rule::MissingStartDate);
    };
    if end.is_some_and(|end| end < start) {
        return Some(Rule::EndBeforeStart);
    }
    if table != OmopTable::Person
        && bounds
            .birth_date(person)
            .is_some_and(|birth| start < birth)
    {
        return Some(Rule::BeforeBirth);
    }
    if !table.is_clinical() {
        return None;
    }
    if let Some(periods) = bounds.periods(person) {
        if periods.is_empty() {
            return Some(Rule::NoObservationPeriod);
        }
        if !periods.iter().any(|period| period.contains(start)) {
            return Some(Rule::OutsideObservationPeriod);
        }
    }
    let last = end.unwrap_or(start);
    if bounds
        .death_date(person)
        .and_then(|death| death.checked_add_signed(grace))
        .is_some_and(|limit| last > limit)
    {
        return Some(Rule::AfterDeath);
    }
    None
}
