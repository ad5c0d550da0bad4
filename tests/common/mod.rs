use cde_forms::*;
use std::sync::Arc;

/// A small rare-disease registry: a demographics form, a body
/// measurements form with a calculated BMI, and a repeatable
/// family-history section.
#[allow(dead_code)]
pub fn demo_definition() -> RegistryDefinition {
    RegistryDefinition::new("ang")
        .with_cde(
            CdeSpec::new("AGE", CdeDataType::Integer)
                .with_label("Age at diagnosis")
                .required()
                .with_range(0.0, 120.0),
        )
        .with_cde(
            CdeSpec::new("SEX", CdeDataType::Choice)
                .with_permitted_value("M", "Male")
                .with_permitted_value("F", "Female"),
        )
        .with_cde(CdeSpec::new("DIAG_DATE", CdeDataType::Date))
        .with_cde(CdeSpec::new("NOTES", CdeDataType::Text).with_max_length(10))
        .with_cde(
            CdeSpec::new("SYMPTOMS", CdeDataType::MultiChoice)
                .with_permitted_value("SEIZ", "Seizures")
                .with_permitted_value("ATAX", "Ataxia")
                .with_permitted_value("SPEECH", "Speech impairment"),
        )
        .with_cde(
            CdeSpec::new("HEIGHT", CdeDataType::Decimal)
                .required()
                .with_range(0.2, 2.5),
        )
        .with_cde(CdeSpec::new("WEIGHT", CdeDataType::Decimal).required())
        .with_cde(
            CdeSpec::new("BMI", CdeDataType::Calculated)
                .with_calculation("WEIGHT / (HEIGHT * HEIGHT)"),
        )
        .with_cde(CdeSpec::new("REL_NAME", CdeDataType::Text).required())
        .with_cde(
            CdeSpec::new("REL_AGE", CdeDataType::Integer).with_range(0.0, 120.0),
        )
        .with_form(
            FormSpec::new("demographics").with_section(
                SectionSpec::new("DEM")
                    .with_display_name("Demographics")
                    .with_cdes(["AGE", "SEX", "DIAG_DATE", "NOTES", "SYMPTOMS"]),
            ),
        )
        .with_form(
            FormSpec::new("body")
                .with_section(
                    SectionSpec::new("MEASURE")
                        .with_display_name("Measurements")
                        .with_cdes(["HEIGHT", "WEIGHT", "BMI"]),
                )
                .with_applicability("AGE"),
        )
        .with_form(
            FormSpec::new("family").with_section(
                SectionSpec::new("RELATIVES")
                    .with_display_name("Affected relatives")
                    .with_cdes(["REL_NAME", "REL_AGE"])
                    .with_max_instances(3),
            ),
        )
}

#[allow(dead_code)]
pub struct TestHarness {
    pub engine: FormEngine,
    pub store: Arc<MemoryDataStore>,
    pub audit: Arc<MemoryAuditSink>,
}

#[allow(dead_code)]
pub fn harness() -> TestHarness {
    let registry = Arc::new(CdeRegistry::new(demo_definition()).unwrap());
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

#[allow(dead_code)]
pub fn patient() -> PatientKey {
    PatientKey::new("ang", "p1")
}

#[allow(dead_code)]
pub fn posted(pairs: &[(&str, serde_json::Value)]) -> PostedValues {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
