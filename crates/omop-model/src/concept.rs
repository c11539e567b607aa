//! Source code to standard concept mappings.

use serde::{Deserialize, Serialize};

/// Domain assigned to codes that could not be mapped.
pub const UNMAPPED_DOMAIN: &str = "Unmapped";

/// Result of resolving a (source code, vocabulary) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMapping {
    pub source_code: String,
    pub source_vocabulary_id: String,
    pub source_concept_id: i64,
    pub standard_concept_id: i64,
    pub standard_domain_id: String,
}

impl ConceptMapping {
    /// Mapping used when a code has no vocabulary entry.
    pub fn unmapped(source_code: &str, vocabulary_id: &str, default_concept_id: i64) -> Self {
        Self {
            source_code: source_code.to_string(),
            source_vocabulary_id: vocabulary_id.to_string(),
            source_concept_id: 0,
            standard_concept_id: default_concept_id,
            standard_domain_id: UNMAPPED_DOMAIN.to_string(),
        }
    }

    pub fn is_unmapped(&self) -> bool {
        self.standard_domain_id == UNMAPPED_DOMAIN
    }
}
