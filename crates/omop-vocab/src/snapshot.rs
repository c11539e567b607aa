//! In-memory vocabulary snapshot.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::lookup::{ConceptLookup, SourceMatch, StandardConcept};
use crate::normalize::normalize_text;
use crate::records::{Concept, ConceptRelationship, MAPS_TO, SourceToConcept};

/// Immutable lookup tables built once per run.
///
/// Source codes are found first in the source-to-concept map, then in the
/// CONCEPT table by `concept_code` (or by normalized `concept_name` for
/// vocabularies registered with [`VocabularySnapshot::with_name_matched`]).
#[derive(Debug, Default, Clone)]
pub struct VocabularySnapshot {
    concepts: HashMap<i64, Concept>,
    by_code: HashMap<(String, String), i64>,
    by_name: HashMap<(String, String), i64>,
    name_matched: HashSet<String>,
    source_map: HashMap<(String, String), SourceMatch>,
    maps_to: HashMap<i64, i64>,
}

impl VocabularySnapshot {
    pub fn new(
        concepts: Vec<Concept>,
        relationships: Vec<ConceptRelationship>,
        source_map: Vec<SourceToConcept>,
    ) -> Self {
        let mut snapshot = Self::default();
        for concept in concepts {
            let vocabulary = concept.vocabulary_id.trim().to_string();
            snapshot
                .by_code
                .entry((vocabulary.clone(), concept.concept_code.trim().to_string()))
                .or_insert(concept.concept_id);
            snapshot
                .by_name
                .entry((vocabulary, normalize_text(&concept.concept_name)))
                .or_insert(concept.concept_id);
            snapshot.concepts.insert(concept.concept_id, concept);
        }
        for relationship in relationships {
            if relationship.relationship_id != MAPS_TO {
                continue;
            }
            // Several targets: keep the smallest id so row order never matters.
            snapshot
                .maps_to
                .entry(relationship.concept_id_1)
                .and_modify(|target| *target = (*target).min(relationship.concept_id_2))
                .or_insert(relationship.concept_id_2);
        }
        for row in source_map {
            let key = (
                row.source_vocabulary_id.trim().to_string(),
                row.source_code.trim().to_string(),
            );
            snapshot.source_map.entry(key).or_insert(SourceMatch {
                source_concept_id: row.source_concept_id,
                direct_target: (row.target_concept_id != 0).then_some(row.target_concept_id),
            });
        }
        debug!(
            concepts = snapshot.concepts.len(),
            maps_to = snapshot.maps_to.len(),
            source_map = snapshot.source_map.len(),
            "built vocabulary snapshot"
        );
        snapshot
    }

    /// Match source values of these vocabularies against concept names.
    #[must_use]
    pub fn with_name_matched<I, S>(mut self, vocabularies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.name_matched
            .extend(vocabularies.into_iter().map(|v| v.as_ref().trim().to_string()));
        self
    }

    pub fn concept(&self, concept_id: i64) -> Option<&Concept> {
        self.concepts.get(&concept_id)
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    fn standard_concept(concept: &Concept) -> Option<StandardConcept> {
        concept.is_standard().then(|| StandardConcept {
            concept_id: concept.concept_id,
            domain_id: concept.domain_id.clone(),
        })
    }
}

impl ConceptLookup for VocabularySnapshot {
    fn find_source(&self, source_code: &str, vocabulary_id: &str) -> Option<SourceMatch> {
        let vocabulary = vocabulary_id.trim();
        let code = source_code.trim();
        if let Some(found) = self
            .source_map
            .get(&(vocabulary.to_string(), code.to_string()))
        {
            return Some(*found);
        }
        let concept_id = if self.name_matched.contains(vocabulary) {
            self.by_name
                .get(&(vocabulary.to_string(), normalize_text(code)))
        } else {
            self.by_code.get(&(vocabulary.to_string(), code.to_string()))
        }?;
        Some(SourceMatch {
            source_concept_id: *concept_id,
            direct_target: None,
        })
    }

    fn maps_to(&self, source_concept_id: i64) -> Option<StandardConcept> {
        let target = self.maps_to.get(&source_concept_id)?;
        self.concepts.get(target).and_then(Self::standard_concept)
    }

    fn standard(&self, concept_id: i64) -> Option<StandardConcept> {
        self.concepts.get(&concept_id).and_then(Self::standard_concept)
    }
}
