use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a non-fatal issue recorded by a transformer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A source code had no vocabulary entry and fell back to the default concept.
    MappingGap,
    /// Rows broke an invariant and were quarantined.
    SchemaViolation,
    /// A correctable value (e.g. a null required concept id) was filled in.
    Repaired,
    /// A value could not be parsed and was treated as null.
    MalformedValue,
    /// A check or step could not run (e.g. missing reference data).
    Skipped,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::MappingGap => "mapping_gap",
            IssueKind::SchemaViolation => "schema_violation",
            IssueKind::Repaired => "repaired",
            IssueKind::MalformedValue => "malformed_value",
            IssueKind::Skipped => "skipped",
        }
    }
}

/// A warning attached to one table of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIssue {
    pub kind: IssueKind,
    /// Column the issue refers to, if any.
    pub column: Option<String>,
    pub message: String,
    /// Number of affected rows.
    pub count: usize,
}

impl TableIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            column: None,
            message: message.into(),
            count: 1,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.kind.as_str())?;
        if let Some(column) = &self.column {
            write!(f, "{column}: ")?;
        }
        write!(f, "{} ({} row", self.message, self.count)?;
        if self.count != 1 {
            f.write_str("s")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_column_and_count() {
        let issue = TableIssue::new(IssueKind::MappingGap, "no concept for `ABC` in ICD10")
            .with_column("condition_source_value")
            .with_count(2);
        assert_eq!(
            issue.to_string(),
            "[mapping_gap] condition_source_value: no concept for `ABC` in ICD10 (2 rows)"
        );
    }
}
