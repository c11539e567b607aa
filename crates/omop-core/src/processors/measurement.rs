//! MEASUREMENT: results split into numeric and categorical values.
//!
//! A result that parses as a number lands in `value_as_number`; any other
//! result is resolved to a concept in `value_as_concept_id`. A row never
//! carries both.

use polars::prelude::{AnyValue, DataFrame};
use tracing::debug;

use omop_ingest::cell_f64;
use omop_model::{ConceptColumn, IssueKind, OmopTable, Result, TableIssue};
use omop_transform::frame::{
    f64_column, has_column, optional_i64_column, optional_text_column, set_f64, set_i64,
};

use super::DomainProcessor;
use super::common::aggregate_episodes;
use crate::context::ProcessingContext;
use crate::mapping::{map_concept_column, map_concepts};

const VALUE_AS_NUMBER: &str = "value_as_number";
const VALUE_AS_CONCEPT: &str = "value_as_concept_id";

const VALUE_CONCEPT: ConceptColumn = ConceptColumn {
    source_value: "value_source_value",
    vocabulary_column: "value_vocabulary_id",
    default_vocabulary: "LOINC",
    concept_id: VALUE_AS_CONCEPT,
    source_concept_id: None,
    required: false,
};

pub(super) struct MeasurementProcessor;

impl DomainProcessor for MeasurementProcessor {
    fn table(&self) -> OmopTable {
        OmopTable::Measurement
    }

    fn description(&self) -> &'static str {
        "Results with numeric or concept values, repeats grouped"
    }

    fn extra_columns(&self) -> &'static [&'static str] {
        &["value_vocabulary_id"]
    }

    fn map(
        &self,
        df: &mut DataFrame,
        ctx: &ProcessingContext<'_>,
        issues: &mut Vec<TableIssue>,
    ) -> Result<()> {
        map_concepts(df, ctx, issues)?;

        let results = optional_text_column(df, VALUE_CONCEPT.source_value)?;
        let mut numbers = if has_column(df, VALUE_AS_NUMBER) {
            f64_column(df, VALUE_AS_NUMBER)?
        } else {
            vec![None; df.height()]
        };
        let mut concepts = optional_i64_column(df, VALUE_AS_CONCEPT)?;
        let mut categorical = vec![false; df.height()];
        for (idx, result) in results.iter().enumerate() {
            if numbers[idx].is_some() {
                continue;
            }
            let Some(text) = result.as_deref() else {
                continue;
            };
            match cell_f64(AnyValue::String(text)) {
                Some(number) => numbers[idx] = Some(number),
                None => categorical[idx] = true,
            }
        }

        let mut both = 0usize;
        for (concept, number) in concepts.iter_mut().zip(&numbers) {
            if number.is_some() && concept.take().is_some() {
                both += 1;
            }
        }
        if both > 0 {
            issues.push(
                TableIssue::new(
                    IssueKind::Repaired,
                    "numeric result cleared the value concept",
                )
                .with_column(VALUE_AS_CONCEPT)
                .with_count(both),
            );
        }
        debug!(
            numeric = numbers.iter().filter(|number| number.is_some()).count(),
            categorical = categorical.iter().filter(|flag| **flag).count(),
            "split measurement results"
        );
        set_f64(df, VALUE_AS_NUMBER, numbers)?;
        set_i64(df, VALUE_AS_CONCEPT, concepts)?;

        if categorical.contains(&true) {
            map_concept_column(df, &VALUE_CONCEPT, ctx, Some(&categorical), issues)?;
        }
        Ok(())
    }

    fn aggregate(
        &self,
        df: DataFrame,
        ctx: &ProcessingContext<'_>,
        _issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame> {
        aggregate_episodes(
            df,
            &[
                "measurement_concept_id",
                "measurement_source_value",
                VALUE_AS_NUMBER,
                VALUE_AS_CONCEPT,
                "value_source_value",
                "unit_concept_id",
                "unit_source_value",
            ],
            ctx,
        )
    }
}
