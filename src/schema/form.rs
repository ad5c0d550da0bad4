use crate::calc::CalcExpr;
use crate::error::{CdeFormsError, Result};
use crate::registry::RegistrySnapshot;
use crate::types::FormSpec;

use super::field::{FieldDescriptor, FieldFactory};

/// One section of a built form schema: the declared fields, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSchema {
    pub code: String,
    pub display_name: String,
    pub is_repeatable: bool,
    pub max_instances: Option<usize>,
    pub fields: Vec<FieldDescriptor>,
}

impl SectionSchema {
    pub fn field(&self, code: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.code == code)
    }
}

/// A built form schema: a plain structured value interpreted by the
/// binder, not a synthesized type. Pure function of the form spec and
/// the registry generation it was built against.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSchema {
    pub name: String,
    pub registry_code: String,
    pub registry_generation: u64,
    pub sections: Vec<SectionSchema>,
    pub applicability: Option<CalcExpr>,
}

impl FormSchema {
    pub fn section(&self, code: &str) -> Option<&SectionSchema> {
        self.sections.iter().find(|s| s.code == code)
    }

    /// All fields in declaration order, paired with their section.
    pub fn fields(&self) -> impl Iterator<Item = (&SectionSchema, &FieldDescriptor)> {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter().map(move |f| (s, f)))
    }

    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }
}

/// Builds form schemas from declarative form specs, resolving CDE
/// references through a registry snapshot.
#[derive(Debug, Clone)]
pub struct FormBuilder {
    factory: FieldFactory,
}

impl FormBuilder {
    pub fn new(factory: FieldFactory) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &FieldFactory {
        &self.factory
    }

    /// Build the schema for one form. A dangling CDE reference or a
    /// misconfigured definition aborts the whole build; a malformed
    /// clinical form must not render partially.
    pub fn build(&self, registry: &RegistrySnapshot, spec: &FormSpec) -> Result<FormSchema> {
        let mut sections = Vec::with_capacity(spec.sections.len());

        for section_spec in &spec.sections {
            let mut fields = Vec::with_capacity(section_spec.cde_codes.len());
            for code in &section_spec.cde_codes {
                let cde = registry.lookup(code)?;
                fields.push(self.factory.create_field(cde)?);
            }
            sections.push(SectionSchema {
                code: section_spec.code.clone(),
                display_name: section_spec.display_name.clone(),
                is_repeatable: section_spec.is_repeatable,
                max_instances: section_spec.max_instances,
                fields,
            });
        }

        let applicability = match &spec.applicability {
            Some(expression) => Some(CalcExpr::parse(expression).map_err(|e| {
                CdeFormsError::configuration(format!(
                    "invalid applicability expression on form `{}`: {e}",
                    spec.name
                ))
            })?),
            None => None,
        };

        tracing::debug!(
            form = %spec.name,
            generation = registry.generation(),
            sections = sections.len(),
            "built form schema"
        );

        Ok(FormSchema {
            name: spec.name.clone(),
            registry_code: registry.registry_code().to_string(),
            registry_generation: registry.generation(),
            sections,
            applicability,
        })
    }
}
