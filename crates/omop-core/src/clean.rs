//! GATHERED -> CLEANED: type coercion and duplicate removal.

use polars::prelude::DataFrame;
use tracing::debug;

use omop_model::roles::{
    END_DATE, PERSON_ID, PROVIDER_ID, START_DATE, TYPE_CONCEPT, VISIT_OCCURRENCE_ID,
};
use omop_model::{FieldType, IssueKind, OmopTable, Result, TableIssue, roles_for, schema_for};
use omop_transform::frame::{
    date_column, drop_duplicate_rows, f64_column, i64_column, set_dates, set_f64, set_i64,
    set_text, text_column,
};

fn column_type(table: OmopTable, name: &str) -> FieldType {
    match name {
        PERSON_ID | TYPE_CONCEPT | PROVIDER_ID | VISIT_OCCURRENCE_ID => FieldType::Integer,
        START_DATE | END_DATE => FieldType::Date,
        other => schema_for(table)
            .field(other)
            .map_or(FieldType::Text, |field| match field.field_type {
                FieldType::Datetime => FieldType::Text,
                kind => kind,
            }),
    }
}

/// Coerce every column to its working type. Values that do not parse become
/// null and are counted per column.
pub(crate) fn clean(
    mut df: DataFrame,
    table: OmopTable,
    issues: &mut Vec<TableIssue>,
) -> Result<DataFrame> {
    let roles = roles_for(table);
    for name in df.get_column_names_owned() {
        let name = name.as_str();
        let texts = text_column(&df, name)?;
        let malformed = match column_type(table, name) {
            FieldType::Integer => {
                let values = i64_column(&df, name)?;
                let bad = count_lost(&texts, &values);
                set_i64(&mut df, name, values)?;
                bad
            }
            FieldType::Float => {
                let values = f64_column(&df, name)?;
                let bad = count_lost(&texts, &values);
                set_f64(&mut df, name, values)?;
                bad
            }
            FieldType::Date => {
                let parsed = date_column(&df, name)?;
                set_dates(&mut df, name, &parsed.values)?;
                parsed.malformed
            }
            FieldType::Text | FieldType::Datetime => {
                set_text(&mut df, name, texts)?;
                0
            }
        };
        if malformed > 0 {
            let column = roles.cdm_column(name).unwrap_or(name);
            issues.push(
                TableIssue::new(IssueKind::MalformedValue, "unparseable values set to null")
                    .with_column(column)
                    .with_count(malformed),
            );
        }
    }

    let removed = drop_duplicate_rows(&mut df)?;
    if removed > 0 {
        debug!(table = %table, removed, "dropped duplicate rows");
        issues.push(
            TableIssue::new(IssueKind::Repaired, "exact duplicate rows removed")
                .with_count(removed),
        );
    }
    Ok(df)
}

fn count_lost<T>(texts: &[Option<String>], values: &[Option<T>]) -> usize {
    texts
        .iter()
        .zip(values)
        .filter(|(text, value)| text.is_some() && value.is_none())
        .count()
}
