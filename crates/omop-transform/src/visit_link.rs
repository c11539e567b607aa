//! Assignment of events to the visit during which they happened.

use std::collections::HashMap;

use chrono::NaiveDate;

/// Date range of an emitted visit occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitSpan {
    pub visit_occurrence_id: i64,
    pub person_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Per-person visit ranges for event linkage.
///
/// Visits of one person with identical start and end dates cannot be told
/// apart, so all of them are left out of the index. When an event date falls
/// inside several visits, the earliest visit (by start, then end) wins.
#[derive(Debug, Default, Clone)]
pub struct VisitIndex {
    by_person: HashMap<i64, Vec<VisitSpan>>,
    ambiguous: usize,
}

impl VisitIndex {
    pub fn new(spans: impl IntoIterator<Item = VisitSpan>) -> Self {
        let mut grouped: HashMap<i64, Vec<VisitSpan>> = HashMap::new();
        for span in spans {
            grouped.entry(span.person_id).or_default().push(span);
        }
        let mut ambiguous = 0usize;
        for visits in grouped.values_mut() {
            visits.sort_by_key(|span| (span.start, span.end, span.visit_occurrence_id));
            let mut kept = Vec::with_capacity(visits.len());
            let mut idx = 0;
            while idx < visits.len() {
                let mut run = idx + 1;
                while run < visits.len()
                    && visits[run].start == visits[idx].start
                    && visits[run].end == visits[idx].end
                {
                    run += 1;
                }
                if run - idx == 1 {
                    kept.push(visits[idx]);
                } else {
                    ambiguous += run - idx;
                }
                idx = run;
            }
            *visits = kept;
        }
        Self {
            by_person: grouped,
            ambiguous,
        }
    }

    /// Visit containing `date` for `person_id` (bounds inclusive).
    pub fn find(&self, person_id: i64, date: NaiveDate) -> Option<i64> {
        self.by_person
            .get(&person_id)?
            .iter()
            .take_while(|span| span.start <= date)
            .find(|span| date <= span.end)
            .map(|span| span.visit_occurrence_id)
    }

    /// Visits dropped because another visit had the same dates.
    pub fn ambiguous_visits(&self) -> usize {
        self.ambiguous
    }

    pub fn is_empty(&self) -> bool {
        self.by_person.is_empty()
    }
}
