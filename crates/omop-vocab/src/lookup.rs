/// Match of a source code in the reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMatch {
    pub source_concept_id: i64,
    /// Target concept given directly by a source-to-concept map row.
    pub direct_target: Option<i64>,
}

/// A standard concept and the domain it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardConcept {
    pub concept_id: i64,
    pub domain_id: String,
}

/// Read-only access to vocabulary reference data.
///
/// Implementations must be deterministic: the same inputs always give the
/// same answer for the lifetime of the value.
pub trait ConceptLookup: Send + Sync {
    /// Find a source code within one vocabulary.
    fn find_source(&self, source_code: &str, vocabulary_id: &str) -> Option<SourceMatch>;

    /// Follow the "Maps to" relationship from a source concept.
    fn maps_to(&self, source_concept_id: i64) -> Option<StandardConcept>;

    /// Returns the concept if it exists and is standard.
    fn standard(&self, concept_id: i64) -> Option<StandardConcept>;
}
