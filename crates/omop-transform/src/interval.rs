//! Removal of spurious overlap between a person's intervals.
//!
//! Multi-day intervals of the same person that share at least one day are
//! merged into one interval spanning their union. Single-day intervals are
//! never touched: several encounters on one day are usually distinct visits
//! to different providers. Two overlapping multi-day intervals with distinct
//! non-null providers are also kept apart.

use std::cmp::Reverse;

use omop_model::Interval;

/// Output of [`reconcile_intervals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled<P> {
    /// Reconciled intervals sorted by (person, start).
    pub intervals: Vec<Interval<P>>,
    /// Number of input intervals absorbed into another one.
    pub merged: usize,
    /// Overlapping pairs left unmerged because their providers differ.
    pub provider_conflicts: usize,
}

/// Reconcile overlapping intervals.
///
/// A merged interval keeps the payload of its earliest member and the first
/// non-null provider among its members. After a provider conflict the
/// interval with the later end keeps absorbing the intervals that follow.
pub fn reconcile_intervals<P>(intervals: Vec<Interval<P>>) -> Reconciled<P> {
    let (mut multi_day, single_day): (Vec<_>, Vec<_>) = intervals
        .into_iter()
        .partition(|interval| !interval.is_single_day());

    multi_day.sort_by_key(|interval| (interval.person_id, interval.start, Reverse(interval.end)));

    let mut merged = 0usize;
    let mut provider_conflicts = 0usize;
    let mut output: Vec<Interval<P>> = Vec::with_capacity(multi_day.len() + single_day.len());
    let mut current: Option<Interval<P>> = None;

    for next in multi_day {
        let Some(mut open) = current.take() else {
            current = Some(next);
            continue;
        };
        if !open.overlaps(&next) {
            output.push(open);
            current = Some(next);
            continue;
        }
        match (open.provider_id, next.provider_id) {
            (Some(a), Some(b)) if a != b => {
                provider_conflicts += 1;
                // The interval reaching further stays open for later overlaps.
                if next.end > open.end {
                    output.push(open);
                    current = Some(next);
                } else {
                    output.push(next);
                    current = Some(open);
                }
            }
            _ => {
                open.end = open.end.max(next.end);
                open.provider_id = open.provider_id.or(next.provider_id);
                merged += 1;
                current = Some(open);
            }
        }
    }
    output.extend(current);
    output.extend(single_day);
    output.sort_by_key(|interval| (interval.person_id, interval.start, interval.end));

    Reconciled {
        intervals: output,
        merged,
        provider_conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn iv(person: i64, start: &str, end: &str, provider: Option<i64>, id: u32) -> Interval<u32> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").expect("start");
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").expect("end");
        Interval::new(person, start, end, provider, id).expect("interval")
    }

    #[test]
    fn chained_overlaps_collapse_into_one() {
        let out = reconcile_intervals(vec![
            iv(1, "2020-01-01", "2020-01-05", None, 0),
            iv(1, "2020-01-04", "2020-01-10", None, 1),
            iv(1, "2020-01-10", "2020-01-12", None, 2),
        ]);
        assert_eq!(out.intervals.len(), 1);
        assert_eq!(out.intervals[0].end.to_string(), "2020-01-12");
        assert_eq!(out.intervals[0].payload, 0);
        assert_eq!(out.merged, 2);
    }

    #[test]
    fn adjacent_days_are_not_overlap() {
        let out = reconcile_intervals(vec![
            iv(1, "2020-01-01", "2020-01-05", None, 0),
            iv(1, "2020-01-06", "2020-01-08", None, 1),
        ]);
        assert_eq!(out.intervals.len(), 2);
        assert_eq!(out.merged, 0);
    }

    #[test]
    fn conflict_keeps_the_longer_interval_open() {
        let out = reconcile_intervals(vec![
            iv(1, "2020-01-01", "2020-01-10", Some(1), 0),
            iv(1, "2020-01-02", "2020-01-05", Some(2), 1),
            iv(1, "2020-01-08", "2020-01-12", None, 2),
        ]);
        assert_eq!(out.provider_conflicts, 1);
        assert_eq!(out.merged, 1);
        let spans: Vec<(String, String, u32)> = out
            .intervals
            .iter()
            .map(|i| (i.start.to_string(), i.end.to_string(), i.payload))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("2020-01-01".to_string(), "2020-01-12".to_string(), 0),
                ("2020-01-02".to_string(), "2020-01-05".to_string(), 1),
            ]
        );
        assert_eq!(out.intervals[0].provider_id, Some(1));
    }

    #[test]
    fn provider_is_kept_from_either_side() {
        let out = reconcile_intervals(vec![
            iv(1, "2020-01-01", "2020-01-05", None, 0),
            iv(1, "2020-01-03", "2020-01-08", Some(42), 1),
        ]);
        assert_eq!(out.intervals.len(), 1);
        assert_eq!(out.intervals[0].provider_id, Some(42));
    }
}
