//! Three-step resolution of source codes to standard concepts.

use omop_model::{ConceptMapping, UNMAPPED_DOMAIN};

use crate::lookup::{ConceptLookup, SourceMatch, StandardConcept};

/// Outcome of resolving one (code, vocabulary) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found and mapped to a standard concept.
    Mapped(ConceptMapping),
    /// Found as a source concept, but no standard concept is reachable.
    NoStandard(ConceptMapping),
    /// Not present in the reference tables.
    Unmapped(ConceptMapping),
}

impl Resolution {
    pub fn mapping(&self) -> &ConceptMapping {
        match self {
            Resolution::Mapped(mapping)
            | Resolution::NoStandard(mapping)
            | Resolution::Unmapped(mapping) => mapping,
        }
    }

    pub fn into_mapping(self) -> ConceptMapping {
        match self {
            Resolution::Mapped(mapping)
            | Resolution::NoStandard(mapping)
            | Resolution::Unmapped(mapping) => mapping,
        }
    }

    /// True when the default concept had to be used.
    pub fn is_gap(&self) -> bool {
        !matches!(self, Resolution::Mapped(_))
    }
}

/// Resolves codes through a [`ConceptLookup`] with a default concept and
/// optional fallback vocabularies.
pub struct VocabularyResolver<'a> {
    lookup: &'a dyn ConceptLookup,
    default_concept_id: i64,
    fallback_vocabularies: &'a [String],
}

impl<'a> VocabularyResolver<'a> {
    pub fn new(lookup: &'a dyn ConceptLookup, default_concept_id: i64) -> Self {
        Self {
            lookup,
            default_concept_id,
            fallback_vocabularies: &[],
        }
    }

    #[must_use]
    pub fn with_fallbacks(mut self, vocabularies: &'a [String]) -> Self {
        self.fallback_vocabularies = vocabularies;
        self
    }

    pub fn default_concept_id(&self) -> i64 {
        self.default_concept_id
    }

    /// Resolve a code declared in `vocabulary_id`.
    ///
    /// The declared vocabulary is tried first, then each fallback in order.
    /// The first vocabulary that reaches a standard concept wins; otherwise
    /// the first source concept found is reported without a standard target.
    pub fn resolve(&self, source_code: &str, vocabulary_id: &str) -> Resolution {
        let mut first_without_standard = None;
        let candidates = std::iter::once(vocabulary_id)
            .chain(self.fallback_vocabularies.iter().map(String::as_str));
        for vocabulary in candidates {
            let Some(found) = self.lookup.find_source(source_code, vocabulary) else {
                continue;
            };
            match self.standard_for(found) {
                Some(standard) => {
                    return Resolution::Mapped(ConceptMapping {
                        source_code: source_code.to_string(),
                        source_vocabulary_id: vocabulary.to_string(),
                        source_concept_id: found.source_concept_id,
                        standard_concept_id: standard.concept_id,
                        standard_domain_id: standard.domain_id,
                    });
                }
                None => {
                    first_without_standard.get_or_insert(ConceptMapping {
                        source_code: source_code.to_string(),
                        source_vocabulary_id: vocabulary.to_string(),
                        source_concept_id: found.source_concept_id,
                        standard_concept_id: self.default_concept_id,
                        standard_domain_id: UNMAPPED_DOMAIN.to_string(),
                    });
                }
            }
        }
        match first_without_standard {
            Some(mapping) => Resolution::NoStandard(mapping),
            None => Resolution::Unmapped(ConceptMapping::unmapped(
                source_code,
                vocabulary_id,
                self.default_concept_id,
            )),
        }
    }

    /// Standard concept id for a code, or the default when unmapped.
    pub fn concept_id(&self, source_code: &str, vocabulary_id: &str) -> i64 {
        self.resolve(source_code, vocabulary_id)
            .mapping()
            .standard_concept_id
    }

    /// The standard concept behind `concept_id`, if it is one.
    pub fn standard(&self, concept_id: i64) -> Option<StandardConcept> {
        self.lookup.standard(concept_id)
    }

    fn standard_for(&self, found: SourceMatch) -> Option<StandardConcept> {
        if let Some(target) = found.direct_target {
            if let Some(standard) = self.lookup.standard(target) {
                return Some(standard);
            }
        }
        self.lookup
            .maps_to(found.source_concept_id)
            .or_else(|| self.lookup.standard(found.source_concept_id))
    }
}
