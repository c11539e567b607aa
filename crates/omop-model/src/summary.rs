use serde::{Deserialize, Serialize};

use crate::issue::{IssueKind, TableIssue};
use crate::table::OmopTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Emitted,
    Failed,
}

/// Outcome of one table in a run, without the data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub table: OmopTable,
    pub status: TableStatus,
    pub input_rows: usize,
    pub output_rows: usize,
    pub quarantined_rows: usize,
    pub issues: Vec<TableIssue>,
    /// SHA-256 of the resolved parameters used for this table.
    pub fingerprint: String,
    pub failure: Option<String>,
}

impl TableSummary {
    pub fn warning_count(&self) -> usize {
        self.issues.len()
    }

    pub fn count_of(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    pub fn is_emitted(&self) -> bool {
        self.status == TableStatus::Emitted
    }
}
