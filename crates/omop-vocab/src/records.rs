//! Rows of the OMOP vocabulary tables the resolver reads.

/// Relationship id linking a source concept to its standard concept.
pub const MAPS_TO: &str = "Maps to";

/// A row of the CONCEPT table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub concept_id: i64,
    pub concept_name: String,
    pub domain_id: String,
    pub vocabulary_id: String,
    pub concept_code: String,
    /// `S` for standard, `C` for classification, `None` otherwise.
    pub standard_concept: Option<String>,
}

impl Concept {
    pub fn is_standard(&self) -> bool {
        self.standard_concept.as_deref() == Some("S")
    }
}

/// A row of the CONCEPT_RELATIONSHIP table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptRelationship {
    pub concept_id_1: i64,
    pub concept_id_2: i64,
    pub relationship_id: String,
}

/// A row of the SOURCE_TO_CONCEPT_MAP table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceToConcept {
    pub source_code: String,
    pub source_vocabulary_id: String,
    pub source_concept_id: i64,
    pub target_concept_id: i64,
}
