mod common;

use common::*;
use std::sync::Arc;

use cde_forms::progress::{self, ChangeKind};
use cde_forms::*;

/// Form with two sections: S1 requires A and B, S2 requires C.
fn two_section_harness() -> TestHarness {
    let definition = RegistryDefinition::new("ang")
        .with_cde(CdeSpec::new("CDE_A", CdeDataType::Text).required())
        .with_cde(CdeSpec::new("CDE_B", CdeDataType::Text).required())
        .with_cde(CdeSpec::new("CDE_C", CdeDataType::Text).required())
        .with_form(
            FormSpec::new("clinical")
                .with_section(SectionSpec::new("S1").with_cdes(["CDE_A", "CDE_B"]))
                .with_section(SectionSpec::new("S2").with_cdes(["CDE_C"])),
        );
    let registry = Arc::new(CdeRegistry::new(definition).unwrap());
    let store = Arc::new(MemoryDataStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = FormEngine::new(EngineConfig::default(), registry, Arc::clone(&store) as _)
        .unwrap()
        .with_audit_sink(Arc::clone(&audit) as _);
    TestHarness {
        engine,
        store,
        audit,
    }
}

#[tokio::test]
async fn sections_aggregate_with_equal_weight() {
    let harness = two_section_harness();
    let schema = harness.engine.build_form("clinical").await.unwrap();

    // A and C filled, B empty: S1 is 1/2, S2 is 1/1, equal weighting
    // gives 0.75.
    let mut doc = ClinicalDocument::new();
    doc.set("CDE_A", CdeValue::Text("yes".into()));
    doc.set("CDE_C", CdeValue::Text("yes".into()));

    assert_eq!(progress::progress(&schema, &doc), 0.75);
}

#[tokio::test]
async fn empty_document_scores_zero() {
    let harness = two_section_harness();
    let schema = harness.engine.build_form("clinical").await.unwrap();
    assert_eq!(progress::progress(&schema, &ClinicalDocument::new()), 0.0);
}

#[tokio::test]
async fn explicit_nulls_do_not_count_as_filled() {
    let harness = two_section_harness();
    let schema = harness.engine.build_form("clinical").await.unwrap();

    let mut doc = ClinicalDocument::new();
    doc.set("CDE_A", CdeValue::Null);
    doc.set("CDE_B", CdeValue::Text("yes".into()));
    doc.set("CDE_C", CdeValue::Text("".into()));

    // Only B is genuinely filled: S1 = 1/2, S2 = 0/1.
    assert_eq!(progress::progress(&schema, &doc), 0.25);
}

#[tokio::test]
async fn form_without_required_fields_is_complete() {
    let harness = harness();
    // The demographics form's only required CDE is AGE; drop it from a
    // variant form to get a no-required-fields schema.
    let definition = demo_definition().with_form(
        FormSpec::new("optional-only")
            .with_section(SectionSpec::new("O").with_cdes(["SEX", "NOTES"])),
    );
    harness.engine.reload_registry(definition).unwrap();
    let schema = harness.engine.build_form("optional-only").await.unwrap();

    assert_eq!(progress::progress(&schema, &ClinicalDocument::new()), 1.0);
}

#[tokio::test]
async fn repeatable_section_with_no_instances_counts_as_one_empty_instance() {
    let harness = harness();
    let schema = harness.engine.build_form("family").await.unwrap();
    assert_eq!(progress::progress(&schema, &ClinicalDocument::new()), 0.0);

    let mut doc = ClinicalDocument::new();
    doc.set("RELATIVES/0/REL_NAME", CdeValue::Text("Maria".into()));
    doc.set("RELATIVES/1/REL_NAME", CdeValue::Null);
    // Instance 0 complete, instance 1 empty: section averages to 0.5.
    assert_eq!(progress::progress(&schema, &doc), 0.5);
}

#[tokio::test]
async fn diff_distinguishes_create_from_clear() {
    let mut v1 = ClinicalDocument::new();
    v1.set("AGE", CdeValue::Integer(40));
    v1.set("NOTES", CdeValue::Text("stable".into()));

    let mut v2 = ClinicalDocument::new();
    v2.set("AGE", CdeValue::Integer(40));
    v2.set("NOTES", CdeValue::Null);
    v2.set("SEX", CdeValue::Code("F".into()));

    let changes = progress::diff(&v1, &v2);
    assert_eq!(changes.len(), 2);

    // Ordered by field key: NOTES before SEX.
    assert_eq!(changes[0].key, "NOTES");
    assert_eq!(changes[0].kind, ChangeKind::Cleared);
    assert_eq!(changes[0].old, Some(CdeValue::Text("stable".into())));
    assert_eq!(changes[0].new, Some(CdeValue::Null));

    assert_eq!(changes[1].key, "SEX");
    assert_eq!(changes[1].kind, ChangeKind::Created);
    assert_eq!(changes[1].old, None);
    assert_eq!(changes[1].new, Some(CdeValue::Code("F".into())));
}

#[tokio::test]
async fn diff_reports_updates_and_removals() {
    let mut v1 = ClinicalDocument::new();
    v1.set("AGE", CdeValue::Integer(40));
    v1.set("NOTES", CdeValue::Text("stable".into()));

    let mut v2 = ClinicalDocument::new();
    v2.set("AGE", CdeValue::Integer(41));

    let changes = progress::diff(&v1, &v2);
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].kind, ChangeKind::Updated);
    assert_eq!(changes[0].old, Some(CdeValue::Integer(40)));
    assert_eq!(changes[0].new, Some(CdeValue::Integer(41)));
    assert_eq!(changes[1].kind, ChangeKind::Removed);
    assert_eq!(changes[1].new, None);
}

#[tokio::test]
async fn unchanged_fields_are_not_reported() {
    let mut doc = ClinicalDocument::new();
    doc.set("AGE", CdeValue::Integer(40));
    assert!(progress::diff(&doc, &doc).is_empty());
}
