//! Tests for resolving source codes against an in-memory vocabulary.

use omop_model::UNMAPPED_DOMAIN;
use omop_vocab::{
    Concept, ConceptLookup, ConceptRelationship, MAPS_TO, Resolution, SourceToConcept,
    VocabularyResolver, VocabularySnapshot,
};
use proptest::prelude::*;

fn concept(id: i64, name: &str, domain: &str, vocab: &str, code: &str, standard: bool) -> Concept {
    Concept {
        concept_id: id,
        concept_name: name.to_string(),
        domain_id: domain.to_string(),
        vocabulary_id: vocab.to_string(),
        concept_code: code.to_string(),
        standard_concept: standard.then(|| "S".to_string()),
    }
}

fn maps_to(from: i64, to: i64) -> ConceptRelationship {
    ConceptRelationship {
        concept_id_1: from,
        concept_id_2: to,
        relationship_id: MAPS_TO.to_string(),
    }
}

fn snapshot() -> VocabularySnapshot {
    VocabularySnapshot::new(
        vec![
            concept(45_591_000, "Essential hypertension", "Condition", "ICD10", "I10", false),
            concept(320_128, "Essential hypertension", "Condition", "SNOMED", "59621000", true),
            concept(35_208_000, "Type 2 diabetes", "Condition", "ICD10CM", "E11", false),
            concept(201_826, "Type 2 diabetes mellitus", "Condition", "SNOMED", "44054006", true),
            concept(1_500, "Orphan code", "Condition", "ICD10", "Z99", false),
            concept(9_202, "Atención primaria", "Visit", "Local Visit", "AP", false),
            concept(9_201, "Inpatient Visit", "Visit", "Visit", "IP", true),
            concept(8_507, "MALE", "Gender", "Gender", "M", true),
        ],
        vec![
            maps_to(45_591_000, 320_128),
            maps_to(35_208_000, 201_826),
            maps_to(9_202, 9_201),
            ConceptRelationship {
                concept_id_1: 1_500,
                concept_id_2: 320_128,
                relationship_id: "Is a".to_string(),
            },
        ],
        vec![SourceToConcept {
            source_code: "H".to_string(),
            source_vocabulary_id: "HIS_SEX".to_string(),
            source_concept_id: 0,
            target_concept_id: 8_507,
        }],
    )
    .with_name_matched(["Local Visit"])
}

#[test]
fn follows_maps_to_relationship() {
    let vocab = snapshot();
    let resolver = VocabularyResolver::new(&vocab, 0);
    let resolution = resolver.resolve("I10", "ICD10");
    assert!(!resolution.is_gap());
    let mapping = resolution.mapping();
    assert_eq!(mapping.source_concept_id, 45_591_000);
    assert_eq!(mapping.standard_concept_id, 320_128);
    assert_eq!(mapping.standard_domain_id, "Condition");
}

#[test]
fn unmapped_code_uses_default_concept() {
    let vocab = snapshot();
    let resolver = VocabularyResolver::new(&vocab, 0);
    let resolution = resolver.resolve("XYZ", "ICD10");
    assert!(matches!(resolution, Resolution::Unmapped(_)));
    let mapping = resolution.mapping();
    assert_eq!(mapping.source_concept_id, 0);
    assert_eq!(mapping.standard_concept_id, 0);
    assert_eq!(mapping.standard_domain_id, UNMAPPED_DOMAIN);
    assert_eq!(resolver.concept_id("XYZ", "ICD10"), 0);
}

#[test]
fn configured_default_concept_is_used_for_gaps() {
    let vocab = snapshot();
    let resolver = VocabularyResolver::new(&vocab, 44_814_649);
    assert_eq!(resolver.concept_id("XYZ", "ICD10"), 44_814_649);
}

#[test]
fn source_concept_without_standard_target_is_a_gap() {
    let vocab = snapshot();
    let resolver = VocabularyResolver::new(&vocab, 0);
    let resolution = resolver.resolve("Z99", "ICD10");
    match resolution {
        Resolution::NoStandard(mapping) => {
            assert_eq!(mapping.source_concept_id, 1_500);
            assert_eq!(mapping.standard_concept_id, 0);
        }
        other => panic!("expected NoStandard, got {other:?}"),
    }
}

#[test]
fn fallback_vocabularies_are_tried_in_order() {
    let vocab = snapshot();
    let fallbacks = vec!["ICD10".to_string(), "ICD10CM".to_string()];
    let resolver = VocabularyResolver::new(&vocab, 0).with_fallbacks(&fallbacks);
    let mapping = resolver.resolve("E11", "LOCAL").into_mapping();
    assert_eq!(mapping.source_vocabulary_id, "ICD10CM");
    assert_eq!(mapping.standard_concept_id, 201_826);
}

#[test]
fn source_to_concept_map_target_is_used_directly() {
    let vocab = snapshot();
    let resolver = VocabularyResolver::new(&vocab, 0);
    let mapping = resolver.resolve("H", "HIS_SEX").into_mapping();
    assert_eq!(mapping.standard_concept_id, 8_507);
    assert_eq!(mapping.standard_domain_id, "Gender");
}

#[test]
fn standard_concepts_map_to_themselves() {
    let vocab = snapshot();
    let resolver = VocabularyResolver::new(&vocab, 0);
    assert_eq!(resolver.concept_id("M", "Gender"), 8_507);
}

#[test]
fn name_matched_vocabularies_ignore_case_and_accents() {
    let vocab = snapshot();
    let resolver = VocabularyResolver::new(&vocab, 0);
    assert_eq!(resolver.concept_id("ATENCION PRIMARIA", "Local Visit"), 9_201);
    assert!(vocab.find_source("AP", "Local Visit").is_none());
}

proptest! {
    #[test]
    fn resolution_is_deterministic(code in "[A-Z][0-9]{1,3}", pick in 0usize..3) {
        let vocab = snapshot();
        let vocabulary = ["ICD10", "ICD10CM", "SNOMED"][pick];
        let resolver = VocabularyResolver::new(&vocab, 0);
        let first = resolver.resolve(&code, vocabulary);
        let second = resolver.resolve(&code, vocabulary);
        prop_assert_eq!(first, second);
    }
}
