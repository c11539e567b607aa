//! Interval reconciliation and visit linkage.

use chrono::{NaiveDate, TimeDelta};
use omop_model::Interval;
use omop_transform::{VisitIndex, VisitSpan, reconcile_intervals};
use proptest::prelude::*;

fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date")
}

fn interval(person: i64, start: &str, end: &str, provider: Option<i64>) -> Interval<usize> {
    Interval::new(person, date(start), date(end), provider, 0).expect("valid interval")
}

#[test]
fn overlapping_visits_merge_into_their_union() {
    let out = reconcile_intervals(vec![
        interval(1, "2020-01-01", "2020-01-05", None),
        interval(1, "2020-01-03", "2020-01-08", None),
    ]);
    assert_eq!(out.intervals.len(), 1);
    let merged = &out.intervals[0];
    assert_eq!(merged.person_id, 1);
    assert_eq!(merged.start, date("2020-01-01"));
    assert_eq!(merged.end, date("2020-01-08"));
}

#[test]
fn same_day_visits_with_distinct_providers_are_kept() {
    let out = reconcile_intervals(vec![
        interval(1, "2020-02-01", "2020-02-01", Some(10)),
        interval(1, "2020-02-01", "2020-02-01", Some(11)),
    ]);
    assert_eq!(out.intervals.len(), 2);
    assert_eq!(out.merged, 0);
}

#[test]
fn distinct_providers_block_multi_day_merge() {
    let out = reconcile_intervals(vec![
        interval(1, "2020-01-01", "2020-01-05", Some(10)),
        interval(1, "2020-01-03", "2020-01-08", Some(11)),
    ]);
    assert_eq!(out.intervals.len(), 2);
    assert_eq!(out.provider_conflicts, 1);
}

#[test]
fn persons_are_reconciled_independently() {
    let out = reconcile_intervals(vec![
        interval(2, "2020-01-01", "2020-01-05", None),
        interval(1, "2020-01-03", "2020-01-08", None),
    ]);
    assert_eq!(out.intervals.len(), 2);
    assert_eq!(out.intervals[0].person_id, 1);
}

#[test]
fn events_link_to_containing_visit() {
    let index = VisitIndex::new([VisitSpan {
        visit_occurrence_id: 7,
        person_id: 1,
        start: date("2020-01-01"),
        end: date("2020-01-08"),
    }]);
    assert_eq!(index.find(1, date("2020-01-08")), Some(7));
    assert_eq!(index.find(1, date("2020-01-09")), None);
}

proptest! {
    #[test]
    fn multi_day_output_has_no_unresolved_overlap(
        rows in prop::collection::vec((0i64..3, 0i64..40, 0i64..6), 0..30)
    ) {
        let base = date("2020-01-01");
        let input: Vec<Interval<usize>> = rows
            .iter()
            .enumerate()
            .filter_map(|(idx, &(person, start, len))| {
                let start = base + TimeDelta::days(start);
                Interval::new(person, start, start + TimeDelta::days(len), None, idx)
            })
            .collect();
        let total = input.len();
        let out = reconcile_intervals(input);
        prop_assert_eq!(out.intervals.len() + out.merged, total);

        let multi: Vec<_> = out.intervals.iter().filter(|i| !i.is_single_day()).collect();
        for pair in multi.windows(2) {
            if pair[0].person_id == pair[1].person_id {
                prop_assert!(!pair[0].overlaps(pair[1]));
            }
        }
        for window in out.intervals.windows(2) {
            prop_assert!(
                (window[0].person_id, window[0].start) <= (window[1].person_id, window[1].start)
            );
        }
    }
}
