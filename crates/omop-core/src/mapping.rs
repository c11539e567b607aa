//! CLEANED -> MAPPED: source values to standard concepts.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use polars::prelude::DataFrame;
use tracing::{debug, warn};

use omop_model::{ConceptColumn, IssueKind, Result, TableIssue, roles_for};
use omop_transform::frame::{optional_i64_column, optional_text_column, set_i64};

use crate::context::ProcessingContext;

/// Resolve every concept column of the table.
pub(crate) fn map_concepts(
    df: &mut DataFrame,
    ctx: &ProcessingContext<'_>,
    issues: &mut Vec<TableIssue>,
) -> Result<()> {
    for column in roles_for(ctx.params.table).concepts {
        map_concept_column(df, column, ctx, None, issues)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Resolved {
    concept_id: i64,
    source_concept_id: i64,
    gap: bool,
}

/// Resolve one concept column, optionally restricted to the rows in `rows`.
///
/// Rows without a source value keep any concept id already present. Each
/// vocabulary with unmapped codes yields one [`IssueKind::MappingGap`] issue
/// carrying the number of distinct codes and affected rows; the codes
/// themselves are only logged under the `omop::data` target.
pub(crate) fn map_concept_column(
    df: &mut DataFrame,
    column: &ConceptColumn,
    ctx: &ProcessingContext<'_>,
    rows: Option<&[bool]>,
    issues: &mut Vec<TableIssue>,
) -> Result<()> {
    let table = ctx.params.table;
    let sources = optional_text_column(df, column.source_value)?;
    if sources.iter().all(Option::is_none) {
        return Ok(());
    }
    let vocabularies = optional_text_column(df, column.vocabulary_column)?;
    let mut concepts = optional_i64_column(df, column.concept_id)?;
    let mut source_concepts = match column.source_concept_id {
        Some(name) => optional_i64_column(df, name)?,
        None => Vec::new(),
    };

    let mut cache: HashMap<(String, String), Resolved> = HashMap::new();
    let mut gaps: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut rejected_overrides: BTreeSet<(String, i64)> = BTreeSet::new();

    for idx in 0..df.height() {
        if rows.is_some_and(|mask| !mask[idx]) {
            continue;
        }
        let Some(code) = sources[idx].as_deref() else {
            continue;
        };
        let vocabulary = vocabularies[idx]
            .as_deref()
            .unwrap_or(column.default_vocabulary);
        let key = (code.to_string(), vocabulary.to_string());
        let resolved = *cache.entry(key.clone()).or_insert_with(|| {
            let resolution = ctx.resolver.resolve(code, vocabulary);
            let mapping = resolution.mapping();
            let mut resolved = Resolved {
                concept_id: mapping.standard_concept_id,
                source_concept_id: mapping.source_concept_id,
                gap: resolution.is_gap(),
            };
            if resolved.gap
                && let Some(target) = ctx.params.unmapped_override(column.source_value, code)
            {
                if ctx.resolver.standard(target).is_some() {
                    resolved.concept_id = target;
                    resolved.gap = false;
                } else {
                    rejected_overrides.insert((code.to_string(), target));
                }
            }
            resolved
        });
        concepts[idx] = Some(resolved.concept_id);
        if let Some(slot) = source_concepts.get_mut(idx) {
            *slot = Some(resolved.source_concept_id);
        }
        if resolved.gap {
            *gaps.entry(key).or_default() += 1;
        }
    }

    set_i64(df, column.concept_id, concepts)?;
    if let Some(name) = column.source_concept_id {
        set_i64(df, name, source_concepts)?;
    }

    for (code, target) in rejected_overrides {
        warn!(
            table = %table,
            column = column.source_value,
            target,
            "override is not a standard concept"
        );
        debug!(
            target: "omop::data",
            table = %table,
            code = %code,
            concept = target,
            "override ignored"
        );
        issues.push(
            TableIssue::new(
                IssueKind::Skipped,
                format!("override ignored: {target} is not a standard concept"),
            )
            .with_column(column.concept_id),
        );
    }
    if gaps.is_empty() {
        return Ok(());
    }
    let rows: usize = gaps.values().sum();
    warn!(
        table = %table,
        column = column.concept_id,
        codes = gaps.len(),
        rows,
        "unmapped source codes"
    );
    // Issues name the vocabulary only; codes go to the data target.
    let mut per_vocabulary: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for ((code, vocabulary), count) in &gaps {
        debug!(
            target: "omop::data",
            table = %table,
            code = %code,
            vocabulary = %vocabulary,
            count,
            "unmapped code"
        );
        let entry = per_vocabulary.entry(vocabulary.as_str()).or_default();
        entry.0 += 1;
        entry.1 += count;
    }
    let default = ctx.resolver.default_concept_id();
    for (vocabulary, (codes, count)) in per_vocabulary {
        issues.push(
            TableIssue::new(
                IssueKind::MappingGap,
                format!("{codes} unmapped {vocabulary} code(s) set to concept {default}"),
            )
            .with_column(column.concept_id)
            .with_count(count),
        );
    }
    Ok(())
}
