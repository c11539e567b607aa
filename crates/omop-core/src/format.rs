//! VALIDATED -> EMITTED: conversion to the CDM table layout.

use std::collections::HashMap;

use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, DataType};

use omop_model::roles::{PERSON_ID, START_DATE};
use omop_model::{FieldSpec, FieldType, OmopTable, Result, roles_for, schema_for};
use omop_transform::frame::{
    date_column, date_series, f64_column, has_column, i64_column, null_column, take_rows,
    text_column,
};

/// Rename working columns to CDM names, order and cast them to the schema,
/// fill missing columns and assign the surrogate key.
///
/// Rows are ordered by (person_id, start date) so keys are stable across runs.
pub(crate) fn format_table(df: DataFrame, table: OmopTable) -> Result<DataFrame> {
    let roles = roles_for(table);
    let schema = schema_for(table);
    let df = sort_rows(df)?;
    let height = df.height();

    let mut sources: HashMap<&str, String> = HashMap::new();
    for name in df.get_column_names_owned() {
        if let Some(cdm) = roles.cdm_column(name.as_str()) {
            let cdm = schema.field(cdm).map(|field| field.name);
            if let Some(cdm) = cdm {
                sources.entry(cdm).or_insert_with(|| name.to_string());
            }
        }
    }

    let mut columns = Vec::with_capacity(schema.fields.len());
    for field in schema.fields {
        if schema.primary_key == Some(field.name) {
            let ids: Vec<i64> = (0..height).map(|idx| idx as i64).collect();
            columns.push(Column::new(field.name.into(), ids));
            continue;
        }
        let column = match sources.get(field.name) {
            Some(source) => convert(&df, source, field)?,
            None if field.required => filled(field, height)?,
            None => null_column(field.name, height, field.field_type),
        };
        columns.push(column);
    }
    Ok(DataFrame::new(columns)?)
}

fn sort_rows(df: DataFrame) -> Result<DataFrame> {
    if !has_column(&df, PERSON_ID) {
        return Ok(df);
    }
    let persons = i64_column(&df, PERSON_ID)?;
    let starts = date_column(&df, START_DATE)?.values;
    let mut order: Vec<usize> = (0..df.height()).collect();
    order.sort_by_key(|&idx| (persons[idx], starts[idx], idx));
    if order.iter().enumerate().all(|(pos, idx)| pos == *idx) {
        return Ok(df);
    }
    take_rows(&df, &order)
}

fn convert(df: &DataFrame, source: &str, field: &FieldSpec) -> Result<Column> {
    let name = field.name;
    let column = match field.field_type {
        FieldType::Integer => Column::new(name.into(), i64_column(df, source)?),
        FieldType::Float => Column::new(name.into(), f64_column(df, source)?),
        FieldType::Text => Column::new(name.into(), text_column(df, source)?),
        FieldType::Date => Column::from(date_series(name, &date_column(df, source)?.values)?),
        FieldType::Datetime => {
            let is_date = df.column(source)?.dtype() == &DataType::Date;
            let values: Vec<Option<String>> = if is_date {
                date_column(df, source)?
                    .values
                    .into_iter()
                    .map(|date| date.map(midnight))
                    .collect()
            } else {
                text_column(df, source)?
            };
            Column::new(name.into(), values)
        }
    };
    Ok(column)
}

fn midnight(date: NaiveDate) -> String {
    format!("{} 00:00:00", date.format("%Y-%m-%d"))
}

fn filled(field: &FieldSpec, height: usize) -> Result<Column> {
    let name = field.name.into();
    Ok(match field.field_type {
        FieldType::Integer => Column::new(name, vec![0i64; height]),
        FieldType::Float => Column::new(name, vec![0f64; height]),
        FieldType::Text | FieldType::Datetime => Column::new(name, vec![""; height]),
        FieldType::Date => null_column(field.name, height, FieldType::Date),
    })
}
