use omop_model::DomainParams;
use omop_vocab::VocabularyResolver;

use crate::reference::ReferenceData;

/// Everything a domain processor may read while transforming one table.
pub struct ProcessingContext<'a> {
    pub params: &'a DomainParams,
    pub resolver: VocabularyResolver<'a>,
    pub reference: &'a ReferenceData,
}
