//! Library side of the `omop` binary: logging, manifests, runs and summaries.

pub mod logging;
pub mod manifest;
pub mod pipeline;
pub mod summary;
