//! Table-specific aggregation logic.
//!
//! Each target table has a [`DomainProcessor`] registered in the
//! [`ProcessorRegistry`]. The shared stages (gather, clean, validate, format)
//! live in the transformer; processors contribute the concept mapping and
//! the aggregation that are specific to their table.
//!
//! | Table | Aggregation |
//! |-------|-------------|
//! | PERSON | birth year, month and day derived from the birth date |
//! | PROVIDER | first row per provider source value |
//! | OBSERVATION_PERIOD | temporal grouping per person, type vote |
//! | DEATH | earliest death record per person |
//! | VISIT_OCCURRENCE | interval reconciliation |
//! | CONDITION_OCCURRENCE | temporal grouping per concept, type vote |
//! | PROCEDURE_OCCURRENCE | temporal grouping per concept, type vote |
//! | DRUG_EXPOSURE | temporal grouping per concept and route, type vote |
//! | MEASUREMENT | value split, grouping of repeated results |

mod common;
mod condition;
mod death;
mod drug;
mod measurement;
mod observation_period;
mod person;
mod procedure;
mod provider;
mod visit;

use std::collections::HashMap;
use std::sync::OnceLock;

use polars::prelude::DataFrame;

use omop_model::{OmopTable, Result, TableIssue};

use crate::context::ProcessingContext;
use crate::mapping::map_concepts;

pub(crate) use common::{link_providers, link_visits};

/// Table-specific steps of a transformer.
pub trait DomainProcessor: Send + Sync {
    fn table(&self) -> OmopTable;

    fn description(&self) -> &'static str {
        "Domain processor"
    }

    /// Input columns outside the CDM schema that the processor reads.
    fn extra_columns(&self) -> &'static [&'static str] {
        &[]
    }

    /// Resolve source values to concepts (CLEANED -> MAPPED).
    fn map(
        &self,
        df: &mut DataFrame,
        ctx: &ProcessingContext<'_>,
        issues: &mut Vec<TableIssue>,
    ) -> Result<()> {
        map_concepts(df, ctx, issues)
    }

    /// Collapse repeated or overlapping records (MAPPED -> AGGREGATED).
    fn aggregate(
        &self,
        df: DataFrame,
        ctx: &ProcessingContext<'_>,
        issues: &mut Vec<TableIssue>,
    ) -> Result<DataFrame>;
}

/// Registry of domain processors indexed by table.
pub struct ProcessorRegistry {
    processors: HashMap<OmopTable, Box<dyn DomainProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
        }
    }

    /// Registers a processor for its table, replacing any previous one.
    pub fn register(&mut self, processor: Box<dyn DomainProcessor>) {
        self.processors.insert(processor.table(), processor);
    }

    pub fn get(&self, table: OmopTable) -> Option<&dyn DomainProcessor> {
        self.processors.get(&table).map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = OmopTable> + '_ {
        self.processors.keys().copied()
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_REGISTRY: OnceLock<ProcessorRegistry> = OnceLock::new();

/// The registry with a processor for every supported table.
pub fn default_registry() -> &'static ProcessorRegistry {
    DEFAULT_REGISTRY.get_or_init(build_default_registry)
}

fn build_default_registry() -> ProcessorRegistry {
    let mut registry = ProcessorRegistry::new();
    registry.register(Box::new(person::PersonProcessor));
    registry.register(Box::new(provider::ProviderProcessor));
    registry.register(Box::new(observation_period::ObservationPeriodProcessor));
    registry.register(Box::new(death::DeathProcessor));
    registry.register(Box::new(visit::VisitProcessor));
    registry.register(Box::new(condition::ConditionProcessor));
    registry.register(Box::new(procedure::ProcedureProcessor));
    registry.register(Box::new(drug::DrugProcessor));
    registry.register(Box::new(measurement::MeasurementProcessor));
    registry
}
