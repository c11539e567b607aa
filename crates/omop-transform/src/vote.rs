//! Categorical mode with an explicit tie-break.

use std::collections::BTreeMap;

use omop_model::TieBreak;

/// Most frequent value; `None` for an empty input.
///
/// Ties go to the smallest value under [`TieBreak::LowestValue`] and to the
/// value seen first under [`TieBreak::FirstSeen`].
pub fn vote<V, I>(values: I, tie_break: TieBreak) -> Option<V>
where
    V: Ord,
    I: IntoIterator<Item = V>,
{
    let mut tally: BTreeMap<V, (usize, usize)> = BTreeMap::new();
    for (position, value) in values.into_iter().enumerate() {
        tally.entry(value).or_insert((0, position)).0 += 1;
    }
    let mut best: Option<(V, usize, usize)> = None;
    // Ascending key order, so under LowestValue the first maximum wins.
    for (value, (count, first_seen)) in tally {
        let better = match &best {
            None => true,
            Some((_, best_count, best_seen)) => {
                count > *best_count
                    || (count == *best_count
                        && tie_break == TieBreak::FirstSeen
                        && first_seen < *best_seen)
            }
        };
        if better {
            best = Some((value, count, first_seen));
        }
    }
    best.map(|(value, _, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_wins() {
        assert_eq!(vote(["A", "A", "B"], TieBreak::LowestValue), Some("A"));
        assert_eq!(vote(["B", "A", "B"], TieBreak::FirstSeen), Some("B"));
    }

    #[test]
    fn ties_follow_policy() {
        assert_eq!(vote(["B", "A"], TieBreak::LowestValue), Some("A"));
        assert_eq!(vote(["B", "A"], TieBreak::FirstSeen), Some("B"));
        assert_eq!(vote([32_817_i64, 32_810], TieBreak::LowestValue), Some(32_810));
    }

    #[test]
    fn empty_input_has_no_mode() {
        assert_eq!(vote(Vec::<i64>::new(), TieBreak::LowestValue), None);
    }
}
