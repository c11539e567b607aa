//! Row-shape transforms applied to gathered extracts.
//!
//! Both operate on the generic `start_date`/`end_date` columns before type
//! coercion, so the date cells are still text.

use polars::prelude::DataFrame;

use omop_model::Result;
use omop_model::roles::{END_DATE, START_DATE};

use crate::frame::{drop_duplicate_rows, has_column, set_text, take_rows, text_column};

/// Split each record into single-day events at its start and at its end.
///
/// Blank dates produce no event. All start events come before all end events,
/// and exact duplicates are removed afterwards.
pub fn melt_start_end(df: &DataFrame) -> Result<DataFrame> {
    let starts = text_column(df, START_DATE)?;
    let ends = if has_column(df, END_DATE) {
        text_column(df, END_DATE)?
    } else {
        vec![None; df.height()]
    };

    let mut rows = Vec::with_capacity(df.height() * 2);
    let mut dates = Vec::with_capacity(df.height() * 2);
    for (idx, value) in starts.iter().chain(ends.iter()).enumerate() {
        if let Some(date) = value {
            rows.push(idx % df.height().max(1));
            dates.push(Some(date.clone()));
        }
    }

    let mut melted = take_rows(df, &rows)?;
    set_text(&mut melted, START_DATE, dates.clone())?;
    set_text(&mut melted, END_DATE, dates)?;
    drop_duplicate_rows(&mut melted)?;
    Ok(melted)
}

/// Collapse every record to a single day at its start date.
pub fn remove_end_date(df: &DataFrame) -> Result<DataFrame> {
    let starts = text_column(df, START_DATE)?;
    let mut out = df.clone();
    set_text(&mut out, END_DATE, starts)?;
    Ok(out)
}
