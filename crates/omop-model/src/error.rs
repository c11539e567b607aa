use polars::prelude::PolarsError;
use thiserror::Error;

use crate::table::OmopTable;

/// Failure of a table transformation.
///
/// Mapping gaps and repaired values are never errors; they are recorded as
/// [`TableIssue`](crate::TableIssue)s on the transformer instead.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The source extract cannot be processed at all (e.g. no person column).
    #[error("malformed input for {table}: {message}")]
    MalformedInput { table: OmopTable, message: String },

    /// An invariant was broken while strict validation is enabled.
    #[error("schema violation in {table}: {count} row(s) failed `{rule}`")]
    SchemaViolation {
        table: OmopTable,
        rule: String,
        count: usize,
    },

    /// The transformer already failed; no further stages run.
    #[error("{table} transformer aborted: {reason}")]
    Aborted { table: OmopTable, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("dataframe error: {0}")]
    Polars(#[from] PolarsError),
}

impl EtlError {
    pub fn malformed(table: OmopTable, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            table,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
