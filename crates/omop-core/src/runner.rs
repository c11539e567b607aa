//! Wave-ordered execution of all table transformers.
//!
//! Tables run in four waves: PERSON and PROVIDER first, then
//! OBSERVATION_PERIOD and DEATH, then VISIT_OCCURRENCE, then the remaining
//! clinical tables. Tables of one wave run in parallel. A failed table never
//! stops its siblings; tables reading its output run with the corresponding
//! checks skipped.

use std::collections::BTreeMap;
use std::sync::Arc;

use polars::prelude::DataFrame;
use rayon::prelude::*;
use tracing::{error, info, info_span, warn};

use omop_model::{
    DomainParams, EtlOptions, OmopTable, Result, TableIssue, TableStatus, TableSummary,
    TransformState,
};
use omop_vocab::ConceptLookup;

use crate::reference::ReferenceData;
use crate::transformer::{DomainTable, DomainTransformer};

/// A table that did not reach EMITTED.
#[derive(Debug, Clone)]
pub struct TableFailure {
    pub table: OmopTable,
    /// Stage that failed.
    pub stage: TransformState,
    pub reason: String,
    pub input_rows: usize,
    /// Issues recorded before the failure.
    pub issues: Vec<TableIssue>,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub enum TableOutcome {
    Emitted(DomainTable),
    Failed(TableFailure),
}

impl TableOutcome {
    pub fn table(&self) -> OmopTable {
        match self {
            TableOutcome::Emitted(table) => table.table(),
            TableOutcome::Failed(failure) => failure.table,
        }
    }

    pub fn is_emitted(&self) -> bool {
        matches!(self, TableOutcome::Emitted(_))
    }

    pub fn issues(&self) -> &[TableIssue] {
        match self {
            TableOutcome::Emitted(table) => table.issues(),
            TableOutcome::Failed(failure) => &failure.issues,
        }
    }

    pub fn summary(&self) -> TableSummary {
        match self {
            TableOutcome::Emitted(table) => table.summary(),
            TableOutcome::Failed(failure) => TableSummary {
                table: failure.table,
                status: TableStatus::Failed,
                input_rows: failure.input_rows,
                output_rows: 0,
                quarantined_rows: 0,
                issues: failure.issues.clone(),
                fingerprint: failure.fingerprint.clone(),
                failure: Some(format!("{}: {}", failure.stage, failure.reason)),
            },
        }
    }
}

/// Outcome of every table that had an extract.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    outcomes: BTreeMap<OmopTable, TableOutcome>,
}

impl RunReport {
    pub fn outcome(&self, table: OmopTable) -> Option<&TableOutcome> {
        self.outcomes.get(&table)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &TableOutcome> + '_ {
        self.outcomes.values()
    }

    /// The emitted table, if the table ran and succeeded.
    pub fn table(&self, table: OmopTable) -> Option<&DomainTable> {
        match self.outcomes.get(&table)? {
            TableOutcome::Emitted(emitted) => Some(emitted),
            TableOutcome::Failed(_) => None,
        }
    }

    pub fn emitted(&self) -> impl Iterator<Item = &DomainTable> + '_ {
        self.outcomes.values().filter_map(|outcome| match outcome {
            TableOutcome::Emitted(table) => Some(table),
            TableOutcome::Failed(_) => None,
        })
    }

    pub fn summaries(&self) -> Vec<TableSummary> {
        self.outcomes.values().map(TableOutcome::summary).collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_emitted()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn warning_count(&self) -> usize {
        self.outcomes.values().map(|o| o.issues().len()).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    fn insert(&mut self, outcome: TableOutcome) {
        self.outcomes.insert(outcome.table(), outcome);
    }
}

/// Runs the transformers of one extraction.
pub struct PipelineRunner {
    lookup: Arc<dyn ConceptLookup>,
    options: EtlOptions,
}

impl PipelineRunner {
    /// Fails when the options hold values no table can run with.
    pub fn new(lookup: Arc<dyn ConceptLookup>, options: EtlOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { lookup, options })
    }

    pub fn options(&self) -> &EtlOptions {
        &self.options
    }

    /// Transform every extract. Tables without an extract are not run.
    pub fn run(&self, mut inputs: BTreeMap<OmopTable, DataFrame>) -> RunReport {
        let mut report = RunReport::default();
        let mut reference = Arc::new(ReferenceData::new());

        for wave in 0..OmopTable::WAVES {
            let jobs: Vec<(OmopTable, DataFrame)> = OmopTable::ALL
                .into_iter()
                .filter(|table| table.wave() == wave)
                .filter_map(|table| inputs.remove(&table).map(|df| (table, df)))
                .collect();
            if !jobs.is_empty() {
                let span = info_span!("wave", wave, tables = jobs.len());
                let _guard = span.enter();
                let outcomes: Vec<TableOutcome> = jobs
                    .into_par_iter()
                    .map(|(table, extract)| {
                        run_table(
                            extract,
                            self.options.for_table(table),
                            self.lookup.as_ref(),
                            &reference,
                        )
                    })
                    .collect();
                for outcome in outcomes {
                    report.insert(outcome);
                }
            }
            reference = Arc::new(self.reference_after(wave, &report, &reference));
        }

        info!(
            emitted = report.success_count(),
            failed = report.failure_count(),
            warnings = report.warning_count(),
            "run complete"
        );
        report
    }

    fn reference_after(
        &self,
        wave: usize,
        report: &RunReport,
        current: &ReferenceData,
    ) -> ReferenceData {
        let frame = |table| report.table(table).map(DomainTable::data);
        let attach = |reference: ReferenceData, table, add: Attach| match frame(table) {
            Some(df) => add(reference, df),
            None => Ok(reference),
        };
        let built = match wave {
            0 => attach(current.clone(), OmopTable::Person, ReferenceData::with_persons)
                .and_then(|r| attach(r, OmopTable::Provider, ReferenceData::with_providers)),
            1 => attach(current.clone(), OmopTable::Death, ReferenceData::with_deaths)
                .and_then(|r| {
                    let add: Attach = ReferenceData::with_observation_periods;
                    attach(r, OmopTable::ObservationPeriod, add)
                }),
            2 => attach(current.clone(), OmopTable::VisitOccurrence, ReferenceData::with_visits),
            _ => Ok(current.clone()),
        };
        built.unwrap_or_else(|err| {
            warn!(wave, error = %err, "reference data unavailable, dependent checks skipped");
            current.clone()
        })
    }
}

type Attach = fn(ReferenceData, &DataFrame) -> Result<ReferenceData>;

fn run_table(
    extract: DataFrame,
    params: DomainParams,
    lookup: &dyn ConceptLookup,
    reference: &ReferenceData,
) -> TableOutcome {
    let table = params.table;
    let input_rows = extract.height();
    let fingerprint = params.fingerprint();
    let failed = |stage: TransformState, reason: String, issues: Vec<TableIssue>| {
        error!(table = %table, stage = %stage, reason = %reason, "table failed");
        TableOutcome::Failed(TableFailure {
            table,
            stage,
            reason,
            input_rows,
            issues,
            fingerprint: fingerprint.clone(),
        })
    };

    let mut transformer = match DomainTransformer::new(extract, params, lookup, reference) {
        Ok(transformer) => transformer,
        Err(err) => return failed(TransformState::Raw, err.to_string(), Vec::new()),
    };
    loop {
        let attempted = transformer.state().next().unwrap_or(TransformState::Emitted);
        match transformer.advance() {
            Ok(TransformState::Emitted) => break,
            Ok(_) => {}
            Err(err) => {
                return failed(attempted, err.to_string(), transformer.warnings().to_vec());
            }
        }
    }
    match transformer.into_output() {
        Ok(emitted) => {
            info!(
                table = %table,
                input = input_rows,
                output = emitted.data().height(),
                quarantined = emitted.quarantined(),
                warnings = emitted.issues().len(),
                "emitted table"
            );
            TableOutcome::Emitted(emitted)
        }
        Err(err) => failed(TransformState::Emitted, err.to_string(), Vec::new()),
    }
}
