//! Stages of a domain transformer.

use std::fmt;

use serde::Serialize;

/// Stage of a per-table transformer. Transitions are strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformState {
    Raw,
    Gathered,
    Cleaned,
    Mapped,
    Aggregated,
    Validated,
    Emitted,
    /// Terminal failure; the table is excluded from the run output.
    Aborted,
}

impl TransformState {
    /// The stage reached by the next successful `advance()`.
    pub fn next(self) -> Option<Self> {
        match self {
            TransformState::Raw => Some(TransformState::Gathered),
            TransformState::Gathered => Some(TransformState::Cleaned),
            TransformState::Cleaned => Some(TransformState::Mapped),
            TransformState::Mapped => Some(TransformState::Aggregated),
            TransformState::Aggregated => Some(TransformState::Validated),
            TransformState::Validated => Some(TransformState::Emitted),
            TransformState::Emitted | TransformState::Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransformState::Raw => "RAW",
            TransformState::Gathered => "GATHERED",
            TransformState::Cleaned => "CLEANED",
            TransformState::Mapped => "MAPPED",
            TransformState::Aggregated => "AGGREGATED",
            TransformState::Validated => "VALIDATED",
            TransformState::Emitted => "EMITTED",
            TransformState::Aborted => "ABORTED",
        }
    }
}

impl fmt::Display for TransformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::TransformState;

    #[test]
    fn walks_forward_to_emitted() {
        let mut state = TransformState::Raw;
        let mut steps = 0;
        while let Some(next) = state.next() {
            assert!(next > state);
            state = next;
            steps += 1;
        }
        assert_eq!(state, TransformState::Emitted);
        assert_eq!(steps, 6);
        assert!(TransformState::Aborted.is_terminal());
    }
}
