//! Column access helpers over Polars data frames.
//!
//! Domain transformers read whole columns into Rust vectors, run the record
//! algorithms, and write the results back. Every reader tolerates text
//! columns (as produced by the CSV ingest) as well as typed ones.

use std::collections::HashSet;

use chrono::NaiveDate;
use polars::prelude::{
    AnyValue, BooleanChunked, Column, DataFrame, DataType, IdxCa, IdxSize, NamedFrom,
    NewChunkedArray, Series,
};

use omop_ingest::{cell_f64, cell_i64, cell_text, date_to_days, days_to_date};
use omop_model::{FieldType, Result};

use crate::dates::parse_date;

/// Dates read from a column, with the number of non-blank unparseable cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDates {
    pub values: Vec<Option<NaiveDate>>,
    pub malformed: usize,
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

fn cells<'a>(df: &'a DataFrame, name: &str) -> Result<impl Iterator<Item = AnyValue<'a>>> {
    let column = df.column(name)?;
    Ok((0..df.height()).map(move |idx| column.get(idx).unwrap_or(AnyValue::Null)))
}

pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(cells(df, name)?.map(cell_text).collect())
}

pub fn i64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    Ok(cells(df, name)?.map(cell_i64).collect())
}

pub fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(cells(df, name)?.map(cell_f64).collect())
}

/// Read a date column; absent columns read as all-null.
pub fn date_column(df: &DataFrame, name: &str) -> Result<ParsedDates> {
    if !has_column(df, name) {
        return Ok(ParsedDates {
            values: vec![None; df.height()],
            malformed: 0,
        });
    }
    let mut parsed = ParsedDates::default();
    for cell in cells(df, name)? {
        let value = match cell {
            AnyValue::Date(days) => days_to_date(days),
            other => match cell_text(other) {
                Some(text) => {
                    let date = parse_date(&text);
                    if date.is_none() {
                        parsed.malformed += 1;
                    }
                    date
                }
                None => None,
            },
        };
        parsed.values.push(value);
    }
    Ok(parsed)
}

/// Optional i64 column; absent columns read as all-null.
pub fn optional_i64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    if has_column(df, name) {
        i64_column(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

/// Optional text column; absent columns read as all-null.
pub fn optional_text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if has_column(df, name) {
        text_column(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

pub fn set_text(df: &mut DataFrame, name: &str, values: Vec<Option<String>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_i64(df: &mut DataFrame, name: &str, values: Vec<Option<i64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_f64(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    df.with_column(Series::new(name.into(), values))?;
    Ok(())
}

pub fn set_dates(df: &mut DataFrame, name: &str, values: &[Option<NaiveDate>]) -> Result<()> {
    df.with_column(date_series(name, values)?)?;
    Ok(())
}

/// A Polars `Date` series built from calendar dates.
pub fn date_series(name: &str, values: &[Option<NaiveDate>]) -> Result<Series> {
    let days: Vec<Option<i32>> = values.iter().map(|d| d.map(date_to_days)).collect();
    Ok(Series::new(name.into(), days).cast(&DataType::Date)?)
}

/// Polars dtype used for a schema field.
pub fn dtype_for(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::Integer => DataType::Int64,
        FieldType::Float => DataType::Float64,
        FieldType::Text | FieldType::Datetime => DataType::String,
        FieldType::Date => DataType::Date,
    }
}

pub fn null_column(name: &str, len: usize, field_type: FieldType) -> Column {
    Column::full_null(name.into(), len, &dtype_for(field_type))
}

/// Keep the rows whose mask entry is `true`.
pub fn filter_rows(df: &mut DataFrame, keep: &[bool]) -> Result<()> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    *df = df.filter(&mask)?;
    Ok(())
}

/// Rows at `indices`, in that order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices
        .iter()
        .map(|&i| IdxSize::try_from(i).unwrap_or(IdxSize::MAX))
        .collect();
    Ok(df.take(&IdxCa::from_vec("idx".into(), idx))?)
}

/// Remove rows identical to an earlier row across all columns.
///
/// Returns the number of removed rows.
pub fn drop_duplicate_rows(df: &mut DataFrame) -> Result<usize> {
    if df.height() < 2 {
        return Ok(0);
    }
    let columns: Vec<Vec<Option<String>>> = df
        .get_column_names()
        .iter()
        .map(|name| text_column(df, name.as_str()))
        .collect::<Result<_>>()?;
    let mut seen: HashSet<Vec<Option<&str>>> = HashSet::with_capacity(df.height());
    let keep: Vec<bool> = (0..df.height())
        .map(|idx| {
            let key: Vec<Option<&str>> = columns.iter().map(|col| col[idx].as_deref()).collect();
            seen.insert(key)
        })
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        filter_rows(df, &keep)?;
    }
    Ok(removed)
}
