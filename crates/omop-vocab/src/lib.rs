//! Vocabulary resolution for source codes.
//!
//! The [`ConceptLookup`] trait is the read-only capability transformers are
//! given; [`VocabularySnapshot`] is the in-memory implementation built from
//! OMOP vocabulary exports, and [`VocabularyResolver`] layers the default
//! concept and fallback vocabularies on top of any lookup.

pub mod error;
pub mod loaders;
pub mod lookup;
pub mod normalize;
pub mod records;
pub mod resolver;
pub mod snapshot;

pub use error::VocabError;
pub use loaders::{
    load_vocabulary_dir, read_concept_relationships, read_concepts, read_source_to_concept_map,
};
pub use lookup::{ConceptLookup, SourceMatch, StandardConcept};
pub use normalize::normalize_text;
pub use records::{Concept, ConceptRelationship, MAPS_TO, SourceToConcept};
pub use resolver::{Resolution, VocabularyResolver};
pub use snapshot::VocabularySnapshot;
