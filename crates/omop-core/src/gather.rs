//! RAW -> GATHERED: header renaming, column selection and record transforms.

use std::collections::BTreeSet;

use polars::prelude::{Column, DataFrame};
use tracing::debug;

use omop_model::roles::{
    END_DATE, PERSON_ID, PROVIDER_ID, PROVIDER_SOURCE_VALUE, START_DATE, TYPE_CONCEPT,
    VISIT_OCCURRENCE_ID, VOCABULARY_ID,
};
use omop_model::{
    DomainParams, EtlError, FieldType, OmopTable, RecordTransform, Result, roles_for, schema_for,
};
use omop_transform::frame::{has_column, null_column};
use omop_transform::{melt_start_end, remove_end_date};

const REQUIRED: &[&str] = &[PERSON_ID, START_DATE];
const OPTIONAL: &[&str] = &[
    END_DATE,
    TYPE_CONCEPT,
    PROVIDER_ID,
    PROVIDER_SOURCE_VALUE,
    VOCABULARY_ID,
    VISIT_OCCURRENCE_ID,
];
const PROVIDER_REQUIRED: &[&str] = &[PROVIDER_SOURCE_VALUE];

fn working_columns(table: OmopTable) -> (&'static [&'static str], &'static [&'static str]) {
    if table.has_person() {
        (REQUIRED, OPTIONAL)
    } else {
        (PROVIDER_REQUIRED, &[])
    }
}

/// Select the columns a table works with and create the missing optional ones.
///
/// Source headers are first renamed through the table's `column_map`. `extra`
/// names processor-specific input columns that are not part of the CDM schema.
pub(crate) fn gather(
    df: DataFrame,
    params: &DomainParams,
    extra: &[&'static str],
) -> Result<DataFrame> {
    let table = params.table;
    let df = rename_columns(df, params)?;
    let (required, optional) = working_columns(table);
    for column in required {
        if !has_column(&df, column) {
            return Err(EtlError::malformed(
                table,
                format!("missing required column `{column}`"),
            ));
        }
    }

    let mut df = df;
    for transform in &params.transforms {
        df = match transform {
            RecordTransform::MeltStartEnd => melt_start_end(&df)?,
            RecordTransform::RemoveEndDate => remove_end_date(&df)?,
        };
    }

    let roles = roles_for(table);
    let mut known: BTreeSet<&str> = required.iter().chain(optional).copied().collect();
    known.extend(schema_for(table).column_names());
    known.extend(extra.iter().copied());
    let mut created: Vec<&str> = optional.to_vec();
    for concept in roles.concepts {
        known.insert(concept.source_value);
        known.insert(concept.vocabulary_column);
        created.push(concept.source_value);
    }

    let mut columns: Vec<Column> = Vec::with_capacity(known.len());
    let mut dropped = Vec::new();
    for column in df.get_columns() {
        if known.contains(column.name().as_str()) {
            columns.push(column.clone());
        } else {
            dropped.push(column.name().to_string());
        }
    }
    for name in created {
        if !has_column(&df, name) {
            columns.push(null_column(name, df.height(), FieldType::Text));
        }
    }
    if !dropped.is_empty() {
        debug!(table = %table, columns = ?dropped, "ignored extract columns");
    }
    Ok(DataFrame::new(columns)?)
}

/// Apply `column_map`; a target may not collide with a header that is kept.
fn rename_columns(df: DataFrame, params: &DomainParams) -> Result<DataFrame> {
    let map = &params.column_map;
    if !map.keys().any(|source| has_column(&df, source)) {
        return Ok(df);
    }
    let mut names = BTreeSet::new();
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().as_str();
        let target = map.get(name).map_or(name, String::as_str);
        if !names.insert(target.to_string()) {
            return Err(EtlError::malformed(
                params.table,
                format!("column `{target}` appears twice after renaming"),
            ));
        }
        columns.push(column.clone().with_name(target.into()));
    }
    debug!(table = %params.table, renamed = map.len(), "renamed extract columns");
    Ok(DataFrame::new(columns)?)
}
