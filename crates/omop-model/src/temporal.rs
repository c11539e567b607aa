//! Time-bounded records.

use chrono::NaiveDate;

/// A bounded clinical event for one person.
///
/// `start <= end` always holds; use [`Interval::new`] to build one from
/// unchecked dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval<P> {
    pub person_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub provider_id: Option<i64>,
    pub payload: P,
}

impl<P> Interval<P> {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(
        person_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        provider_id: Option<i64>,
        payload: P,
    ) -> Option<Self> {
        (start <= end).then_some(Self {
            person_id,
            start,
            end,
            provider_id,
            payload,
        })
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// True when both intervals belong to the same person and share at least one day.
    pub fn overlaps<Q>(&self, other: &Interval<Q>) -> bool {
        self.person_id == other.person_id && self.start <= other.end && other.start <= self.end
    }
}

/// Span of time during which a person's data is considered complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationPeriod {
    pub person_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ObservationPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
