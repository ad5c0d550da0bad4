//! Importer for JSON registry definition files.
//!
//! The file carries three arrays: `cdes`, `sections`, and `forms`.
//! Sections are declared once and referenced from forms by code, so a
//! section shared between forms is defined a single time. Structural
//! problems (bad JSON, an unknown data-type tag, a form naming a
//! section that was never declared) are configuration errors.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{CdeFormsError, Result};
use crate::types::{CdeDataType, CdeSpec, FormSpec, PermittedValue, SectionSpec};

use super::RegistryDefinition;

#[derive(Debug, Deserialize)]
struct RawDefinition {
    code: String,
    #[serde(default)]
    cdes: Vec<RawCde>,
    #[serde(default)]
    sections: Vec<RawSection>,
    #[serde(default)]
    forms: Vec<RawForm>,
}

#[derive(Debug, Deserialize)]
struct RawCde {
    code: String,
    #[serde(default)]
    label: Option<String>,
    data_type: String,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    min_value: Option<f64>,
    #[serde(default)]
    max_value: Option<f64>,
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    permitted_values: Vec<RawPermittedValue>,
    #[serde(default)]
    calculation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPermittedValue {
    value: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    code: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    cdes: Vec<String>,
    #[serde(default)]
    is_repeatable: bool,
    #[serde(default)]
    max_instances: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawForm {
    name: String,
    sections: Vec<String>,
    #[serde(default)]
    applicability: Option<String>,
}

/// Parse a registry definition from its JSON source.
pub fn parse_definition(json: &str) -> Result<RegistryDefinition> {
    let raw: RawDefinition = serde_json::from_str(json).map_err(|e| {
        CdeFormsError::configuration(format!("malformed registry definition: {e}"))
    })?;
    convert(raw)
}

/// Parse a registry definition from an already-decoded JSON value.
pub fn parse_definition_value(value: serde_json::Value) -> Result<RegistryDefinition> {
    let raw: RawDefinition = serde_json::from_value(value).map_err(|e| {
        CdeFormsError::configuration(format!("malformed registry definition: {e}"))
    })?;
    convert(raw)
}

fn convert(raw: RawDefinition) -> Result<RegistryDefinition> {
    let mut definition = RegistryDefinition::new(raw.code);

    for cde in raw.cdes {
        definition.cdes.push(convert_cde(cde)?);
    }

    let mut sections: HashMap<String, SectionSpec> = HashMap::with_capacity(raw.sections.len());
    for section in raw.sections {
        let spec = SectionSpec {
            display_name: section.display_name.unwrap_or_else(|| section.code.clone()),
            code: section.code,
            cde_codes: section.cdes,
            is_repeatable: section.is_repeatable || section.max_instances.is_some(),
            max_instances: section.max_instances,
        };
        if sections.insert(spec.code.clone(), spec).is_some() {
            return Err(CdeFormsError::configuration(
                "duplicate section code in registry definition",
            ));
        }
    }

    for form in raw.forms {
        let mut spec = FormSpec::new(form.name);
        spec.applicability = form.applicability;
        for section_code in &form.sections {
            let section = sections.get(section_code).ok_or_else(|| {
                CdeFormsError::configuration(format!(
                    "form `{}` references undeclared section `{section_code}`",
                    spec.name
                ))
            })?;
            spec.sections.push(section.clone());
        }
        definition.forms.push(spec);
    }

    Ok(definition)
}

fn convert_cde(raw: RawCde) -> Result<CdeSpec> {
    let data_type = CdeDataType::parse(&raw.code, &raw.data_type)?;
    Ok(CdeSpec {
        label: raw.label.unwrap_or_else(|| raw.code.clone()),
        code: raw.code,
        data_type,
        is_required: raw.is_required,
        min_value: raw.min_value,
        max_value: raw.max_value,
        max_length: raw.max_length,
        pattern: raw.pattern,
        permitted_values: raw
            .permitted_values
            .into_iter()
            .map(|pv| PermittedValue {
                label: pv.label.unwrap_or_else(|| pv.value.clone()),
                value: pv.value,
            })
            .collect(),
        calculation: raw.calculation,
    })
}
