//! PERSON: one row per person with derived birth components.

use chrono::Datelike;
use polars::prelude::DataFrame;

use omop_model::roles::START_DATE;
use omop_model::{OmopTable, Result, TableIssue};
use omop_transform::frame::{date_column, set_i64};

use super::DomainProcessor;
use crate::context::ProcessingContext;

pub(super) struct PersonProcessor;

impl DomainProcessor for PersonProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::Person
    }

    fn description(&self) -> &'static str {
        "Demographics with gender, race and ethnicity concepts"
    }

    fn aggregate(
        &self,
        mut df: DataFrame,
        _ctx: &ProcessingContext<'_>,
        _issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        let births = date_column(&df, START_DATE)?.values;
        let component = |part: fn(&chrono::NaiveDate) -> i64| -> Vec<Option<i64>> {
            births.iter().map(|birth| birth.as_ref().map(part)).collect()
        };
        let years = component(|date| i64::from(date.year()));
        let months = component(|date| i64::from(date.month()));
        let days = component(|date| i64::from(date.day()));
        set_i64(&mut df, "year_of_birth", years)?;
        set_i64(&mut df, "month_of_birth", months)?;
        set_i64(&mut df, "day_of_birth", days)?;
        Ok(df)
    }
}
