mod common;

use common::*;
use std::sync::Arc;

use cde_forms::*;

#[tokio::test]
async fn build_form_preserves_declared_order() {
    let harness = harness();
    let schema = harness.engine.build_form("demographics").await.unwrap();

    assert_eq!(schema.sections.len(), 1);
    let codes: Vec<_> = schema
        .fields()
        .map(|(_, field)| field.code.as_str())
        .collect();
    assert_eq!(codes, ["AGE", "SEX", "DIAG_DATE", "NOTES", "SYMPTOMS"]);
}

#[tokio::test]
async fn unknown_form_is_a_configuration_error() {
    let harness = harness();
    let err = harness.engine.build_form("no-such-form").await.unwrap_err();
    assert!(matches!(err, CdeFormsError::UnknownForm { ref name } if name == "no-such-form"));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn dangling_cde_reference_aborts_the_build() {
    let definition = demo_definition().with_form(
        FormSpec::new("broken")
            .with_section(SectionSpec::new("S").with_cdes(["AGE", "MISSING_CDE"])),
    );
    let registry = Arc::new(CdeRegistry::new(definition).unwrap());
    let store = Arc::new(MemoryDataStore::new());
    let engine = FormEngine::new(EngineConfig::default(), registry, store).unwrap();

    let err = engine.build_form("broken").await.unwrap_err();
    assert!(matches!(err, CdeFormsError::UnknownCde { ref code } if code == "MISSING_CDE"));
}

#[tokio::test]
async fn built_schemas_are_cached_per_generation() {
    let harness = harness();
    let first = harness.engine.build_form("demographics").await.unwrap();
    let second = harness.engine.build_form("demographics").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn registry_reload_invalidates_cached_schemas() {
    let harness = harness();
    let old = harness.engine.build_form("demographics").await.unwrap();
    assert_eq!(old.registry_generation, 1);

    let generation = harness.engine.reload_registry(demo_definition()).unwrap();
    assert_eq!(generation, 2);

    let new = harness.engine.build_form("demographics").await.unwrap();
    assert!(!Arc::ptr_eq(&old, &new));
    assert_eq!(new.registry_generation, 2);

    // The old schema remains internally coherent for in-flight work.
    assert_eq!(old.field_count(), new.field_count());
}

#[tokio::test]
async fn calculated_field_is_read_only_in_the_schema() {
    let harness = harness();
    let schema = harness.engine.build_form("body").await.unwrap();
    let bmi = schema.section("MEASURE").unwrap().field("BMI").unwrap();
    assert_eq!(bmi.widget, WidgetKind::ReadOnly);
    assert!(bmi.is_calculated());
}

#[tokio::test]
async fn repeatable_section_carries_its_instance_bound() {
    let harness = harness();
    let schema = harness.engine.build_form("family").await.unwrap();
    let section = schema.section("RELATIVES").unwrap();
    assert!(section.is_repeatable);
    assert_eq!(section.max_instances, Some(3));
}
