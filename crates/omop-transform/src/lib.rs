//! Record-level algorithms used by the domain transformers.
//!
//! The leaf algorithms ([`interval`], [`grouping`], [`vote`], [`visit_link`])
//! operate on plain Rust records whose payload identifies the source row, so
//! they can be tested without frames. [`frame`] and [`reshape`] adapt them to
//! Polars data frames.

pub mod dates;
pub mod frame;
pub mod grouping;
pub mod interval;
pub mod reshape;
pub mod visit_link;
pub mod vote;

pub use dates::parse_date;
pub use grouping::{DatedRecord, Episode, GroupedDates, group_dates};
pub use interval::{Reconciled, reconcile_intervals};
pub use reshape::{melt_start_end, remove_end_date};
pub use visit_link::{VisitIndex, VisitSpan};
pub use vote::vote;
