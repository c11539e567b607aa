//! Validation of aggregated tables before emission.
//!
//! Checks run on frames that still use the working column names of
//! [`omop_model::roles`]. Correctable problems are repaired in place and
//! reported as [`IssueKind::Repaired`](omop_model::IssueKind::Repaired);
//! rows that break an invariant are quarantined, or abort the table under
//! strict validation.

mod bounds;
mod rules;
mod validator;

pub use bounds::PersonBounds;
pub use rules::{REJECTION_REASON, Rule};
pub use validator::{ValidationOutcome, validate_table};
