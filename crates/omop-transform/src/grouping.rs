//! Temporal grouping of repeated records into episodes.
//!
//! Records sharing a key are ordered by start date. A record joins the open
//! episode when its start falls no more than `window_days` after the
//! episode's latest end; with a window of zero only records on the same or
//! overlapping dates join. Each episode becomes one record spanning the
//! earliest start to the latest end, whose value is the vote of its members.

use std::cmp::Reverse;

use chrono::NaiveDate;
use omop_model::TieBreak;

use crate::vote::vote;

/// A dated record with a grouping key and a categorical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedRecord<K, V> {
    pub key: K,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub value: Option<V>,
}

/// Members of one episode, as indices into the grouped input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Member with the earliest start.
    pub first: usize,
    /// Member that supplies the episode end.
    pub last: usize,
    /// All members in date order.
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedDates<K, V> {
    /// One record per episode, sorted by (key, start).
    pub records: Vec<DatedRecord<K, V>>,
    /// Episode bookkeeping, parallel to `records`.
    pub episodes: Vec<Episode>,
}

/// Group records into episodes. Grouping an already grouped set with the same
/// window returns the same records.
///
/// Records whose end precedes their start are treated as single-day records
/// at their start date.
pub fn group_dates<K, V>(
    records: &[DatedRecord<K, V>],
    window_days: i64,
    tie_break: TieBreak,
) -> GroupedDates<K, V>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    let end_of = |record: &DatedRecord<K, V>| record.end.max(record.start);
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&records[a], &records[b]);
        (&ra.key, ra.start, Reverse(end_of(ra)), a)
            .cmp(&(&rb.key, rb.start, Reverse(end_of(rb)), b))
    });

    let mut grouped = GroupedDates {
        records: Vec::new(),
        episodes: Vec::new(),
    };
    let mut open: Option<(Episode, NaiveDate)> = None;

    for idx in order {
        let record = &records[idx];
        if let Some((episode, end)) = open.as_mut() {
            let head = &records[episode.first];
            let gap = record.start.signed_duration_since(*end).num_days();
            if head.key == record.key && gap <= window_days {
                episode.members.push(idx);
                if end_of(record) >= *end {
                    *end = end_of(record);
                    episode.last = idx;
                }
                continue;
            }
        }
        if let Some((episode, end)) = open.take() {
            close_episode(records, episode, end, tie_break, &mut grouped);
        }
        open = Some((
            Episode {
                first: idx,
                last: idx,
                members: vec![idx],
            },
            end_of(record),
        ));
    }
    if let Some((episode, end)) = open {
        close_episode(records, episode, end, tie_break, &mut grouped);
    }
    grouped
}

fn close_episode<K: Ord + Clone, V: Ord + Clone>(
    records: &[DatedRecord<K, V>],
    episode: Episode,
    end: NaiveDate,
    tie_break: TieBreak,
    grouped: &mut GroupedDates<K, V>,
) {
    let head = &records[episode.first];
    let value = vote(
        episode
            .members
            .iter()
            .filter_map(|&member| records[member].value.clone()),
        tie_break,
    );
    grouped.records.push(DatedRecord {
        key: head.key.clone(),
        start: head.start,
        end,
        value,
    });
    grouped.episodes.push(episode);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(person: i64, start: &str, end: &str, value: i64) -> DatedRecord<i64, i64> {
        DatedRecord {
            key: person,
            start: NaiveDate::parse_from_str(start, "%Y-%m-%d").expect("start"),
            end: NaiveDate::parse_from_str(end, "%Y-%m-%d").expect("end"),
            value: Some(value),
        }
    }

    #[test]
    fn marks_first_and_last_members() {
        let input = vec![
            rec(1, "2020-03-01", "2020-04-01", 2),
            rec(1, "2020-01-01", "2020-02-01", 1),
            rec(1, "2020-05-01", "2020-12-01", 2),
        ];
        let grouped = group_dates(&input, 365, TieBreak::LowestValue);
        assert_eq!(grouped.records.len(), 1);
        assert_eq!(grouped.episodes[0].first, 1);
        assert_eq!(grouped.episodes[0].last, 2);
        assert_eq!(grouped.episodes[0].members, vec![1, 0, 2]);
        assert_eq!(grouped.records[0].value, Some(2));
    }
}
