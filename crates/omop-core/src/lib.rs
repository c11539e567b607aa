//! Per-table OMOP transformers and the pipeline runner.
//!
//! Each target table is produced by a [`DomainTransformer`], a small state
//! machine that gathers, cleans, maps, aggregates, validates and formats one
//! source extract. The [`PipelineRunner`] orders the transformers in
//! dependency waves and collects their outcomes in a [`RunReport`].

mod clean;
pub mod context;
mod format;
mod gather;
mod mapping;
pub mod processors;
pub mod reference;
pub mod runner;
pub mod transformer;

pub use context::ProcessingContext;
pub use processors::{DomainProcessor, ProcessorRegistry, default_registry};
pub use reference::ReferenceData;
pub use runner::{PipelineRunner, RunReport, TableFailure, TableOutcome};
pub use transformer::{DomainTable, DomainTransformer};
