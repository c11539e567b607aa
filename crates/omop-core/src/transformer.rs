//! Per-table state machine.
//!
//! A [`DomainTransformer`] walks one extract through
//! RAW -> GATHERED -> CLEANED -> MAPPED -> AGGREGATED -> VALIDATED -> EMITTED.
//! Each `advance()` runs exactly one stage. A failing stage moves the
//! transformer to ABORTED, where it stays.

use polars::prelude::DataFrame;
use tracing::{debug, info, info_span, warn};

use omop_model::{
    DomainParams, EtlError, OmopTable, Result, TableIssue, TableStatus, TableSummary,
    TransformState,
};
use omop_validate::validate_table;
use omop_vocab::{ConceptLookup, VocabularyResolver};

use crate::clean::clean;
use crate::context::ProcessingContext;
use crate::format::format_table;
use crate::gather::gather;
use crate::processors::{DomainProcessor, default_registry, link_providers, link_visits};
use crate::reference::ReferenceData;

/// An emitted CDM table with its provenance.
#[derive(Debug, Clone)]
pub struct DomainTable {
    table: OmopTable,
    data: DataFrame,
    rejected: Option<DataFrame>,
    issues: Vec<TableIssue>,
    input_rows: usize,
    quarantined: usize,
    params: DomainParams,
}

impl DomainTable {
    pub fn table(&self) -> OmopTable {
        self.table
    }

    /// Rows in CDM layout.
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Quarantined rows, when the retain policy is active.
    pub fn rejected(&self) -> Option<&DataFrame> {
        self.rejected.as_ref()
    }

    pub fn issues(&self) -> &[TableIssue] {
        &self.issues
    }

    pub fn input_rows(&self) -> usize {
        self.input_rows
    }

    pub fn quarantined(&self) -> usize {
        self.quarantined
    }

    pub fn params(&self) -> &DomainParams {
        &self.params
    }

    pub fn fingerprint(&self) -> String {
        self.params.fingerprint()
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            table: self.table,
            status: TableStatus::Emitted,
            input_rows: self.input_rows,
            output_rows: self.data.height(),
            quarantined_rows: self.quarantined,
            issues: self.issues.clone(),
            fingerprint: self.fingerprint(),
            failure: None,
        }
    }
}

/// Transforms one source extract into one CDM table.
pub struct DomainTransformer<'a> {
    table: OmopTable,
    state: TransformState,
    params: DomainParams,
    lookup: &'a dyn ConceptLookup,
    reference: &'a ReferenceData,
    processor: &'static dyn DomainProcessor,
    frame: DataFrame,
    input_rows: usize,
    issues: Vec<TableIssue>,
    rejected: Option<DataFrame>,
    quarantined: usize,
    failure: Option<String>,
}

impl<'a> DomainTransformer<'a> {
    /// Create a transformer in the RAW state.
    pub fn new(
        extract: DataFrame,
        params: DomainParams,
        lookup: &'a dyn ConceptLookup,
        reference: &'a ReferenceData,
    ) -> Result<Self> {
        let table = params.table;
        let processor = default_registry().get(table).ok_or_else(|| {
            EtlError::Config(format!("no processor registered for {table}"))
        })?;
        Ok(Self {
            table,
            state: TransformState::Raw,
            input_rows: extract.height(),
            params,
            lookup,
            reference,
            processor,
            frame: extract,
            issues: Vec::new(),
            rejected: None,
            quarantined: 0,
            failure: None,
        })
    }

    pub fn table(&self) -> OmopTable {
        self.table
    }

    pub fn state(&self) -> TransformState {
        self.state
    }

    /// Non-fatal issues recorded so far.
    pub fn warnings(&self) -> &[TableIssue] {
        &self.issues
    }

    pub fn params(&self) -> &DomainParams {
        &self.params
    }

    pub fn fingerprint(&self) -> String {
        self.params.fingerprint()
    }

    /// Reason of the failure that aborted the transformer.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Run the next stage and return the state reached.
    ///
    /// Advancing an emitted transformer does nothing. Advancing an aborted
    /// one returns [`EtlError::Aborted`].
    pub fn advance(&mut self) -> Result<TransformState> {
        let next = match self.state {
            TransformState::Emitted => return Ok(TransformState::Emitted),
            TransformState::Aborted => {
                return Err(EtlError::Aborted {
                    table: self.table,
                    reason: self.failure.clone().unwrap_or_default(),
                });
            }
            state => state.next().unwrap_or(TransformState::Emitted),
        };
        let span = info_span!("transform", table = %self.table, stage = %next);
        let _guard = span.enter();
        match self.run_stage(next) {
            Ok(()) => {
                debug!(rows = self.frame.height(), "stage complete");
                self.state = next;
                Ok(next)
            }
            Err(error) => {
                warn!(%error, "transformer aborted");
                self.state = TransformState::Aborted;
                self.failure = Some(error.to_string());
                self.frame = DataFrame::empty();
                Err(error)
            }
        }
    }

    /// Advance until EMITTED and return the table.
    pub fn run(mut self) -> Result<DomainTable> {
        while self.state != TransformState::Emitted {
            self.advance()?;
        }
        let table = self.into_output()?;
        info!(
            table = %table.table,
            input = table.input_rows,
            output = table.data.height(),
            quarantined = table.quarantined,
            warnings = table.issues.len(),
            "emitted table"
        );
        Ok(table)
    }

    /// The emitted table; fails unless the transformer is EMITTED.
    pub fn into_output(self) -> Result<DomainTable> {
        if self.state != TransformState::Emitted {
            return Err(EtlError::Aborted {
                table: self.table,
                reason: self
                    .failure
                    .unwrap_or_else(|| format!("not emitted (state {})", self.state)),
            });
        }
        Ok(DomainTable {
            table: self.table,
            data: self.frame,
            rejected: self.rejected,
            issues: self.issues,
            input_rows: self.input_rows,
            quarantined: self.quarantined,
            params: self.params,
        })
    }

    fn run_stage(&mut self, stage: TransformState) -> Result<()> {
        let df = std::mem::replace(&mut self.frame, DataFrame::empty());
        self.frame = match stage {
            TransformState::Gathered => {
                gather(df, &self.params, self.processor.extra_columns())?
            }
            TransformState::Cleaned => clean(df, self.table, &mut self.issues)?,
            TransformState::Mapped => {
                let mut df = df;
                let ctx = context(&self.params, self.lookup, self.reference);
                self.processor.map(&mut df, &ctx, &mut self.issues)?;
                if self.table.links_providers() {
                    link_providers(&mut df, &ctx, &mut self.issues)?;
                }
                df
            }
            TransformState::Aggregated => {
                let ctx = context(&self.params, self.lookup, self.reference);
                let mut df = self.processor.aggregate(df, &ctx, &mut self.issues)?;
                if self.table.links_visits() {
                    link_visits(&mut df, &ctx)?;
                }
                df
            }
            TransformState::Validated => {
                let outcome = validate_table(df, &self.params, self.reference.bounds())?;
                self.rejected = outcome.rejected;
                self.quarantined = outcome.quarantined;
                self.issues.extend(outcome.issues);
                outcome.frame
            }
            TransformState::Emitted => format_table(df, self.table)?,
            TransformState::Raw | TransformState::Aborted => df,
        };
        Ok(())
    }
}

fn context<'b>(
    params: &'b DomainParams,
    lookup: &'b dyn ConceptLookup,
    reference: &'b ReferenceData,
) -> ProcessingContext<'b> {
    ProcessingContext {
        params,
        resolver: VocabularyResolver::new(lookup, params.default_concept_id)
            .with_fallbacks(&params.fallback_vocabularies),
        reference,
    }
}
