//! Binding and validation over built form schemas.
//!
//! The load path (`populate`) never fails: missing values become field
//! defaults and calculated fields are recomputed from whatever sibling
//! values exist. The submit path (`validate`) coerces and checks every
//! field, collecting all errors in one pass; the outcome is
//! all-or-nothing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{FieldDescriptor, FormSchema, SectionSchema, WidgetKind};
use crate::types::{
    CdeDataType, CdeValue, ClinicalDocument, DATE_FORMAT, PostedValues, ValueMap,
    instance_field_key, split_field_key,
};

/// Errors reported for one field, keyed by its field key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldError {
    pub key: String,
    pub messages: Vec<String>,
}

impl FieldError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            messages: vec![message.into()],
        }
    }
}

/// Outcome of a submission: either a complete coerced value map or the
/// full list of per-field errors in declaration order. Never both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ValidationResult {
    Valid { values: ValueMap },
    Invalid { errors: Vec<FieldError> },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn values(&self) -> Option<&ValueMap> {
        match self {
            Self::Valid { values } => Some(values),
            Self::Invalid { .. } => None,
        }
    }

    pub fn into_values(self) -> Option<ValueMap> {
        match self {
            Self::Valid { values } => Some(values),
            Self::Invalid { .. } => None,
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid { .. } => &[],
            Self::Invalid { errors } => errors,
        }
    }
}

/// One field bound for display.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub key: String,
    pub code: String,
    pub label: String,
    pub widget: WidgetKind,
    pub value: CdeValue,
}

/// One instance of a section (repeatable sections bind 0..N of these).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundInstance {
    pub index: usize,
    pub fields: Vec<BoundField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundSection {
    pub code: String,
    pub display_name: String,
    pub is_repeatable: bool,
    pub instances: Vec<BoundInstance>,
}

/// A form schema populated with a patient's stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundForm {
    pub form_name: String,
    pub sections: Vec<BoundSection>,
}

impl BoundForm {
    pub fn field(&self, key: &str) -> Option<&BoundField> {
        self.sections
            .iter()
            .flat_map(|s| s.instances.iter())
            .flat_map(|i| i.fields.iter())
            .find(|f| f.key == key)
    }
}

/// Bind a document's stored values into a schema for display.
pub fn populate(schema: &FormSchema, document: &ClinicalDocument) -> BoundForm {
    let mut sections = Vec::with_capacity(schema.sections.len());

    for section in &schema.sections {
        let indices = if section.is_repeatable {
            let mut found = document_instances(document, &section.code);
            if found.is_empty() {
                // A repeatable section with no data still renders one
                // blank instance.
                found.push(0);
            }
            found
        } else {
            vec![0]
        };

        let mut instances = Vec::with_capacity(indices.len());
        for index in indices {
            let mut fields = Vec::with_capacity(section.fields.len());
            for field in &section.fields {
                let key = section_field_key(section, index, &field.code);
                let value = if field.is_calculated() {
                    recompute(field, section, index, &document.fields)
                } else {
                    document.get(&key).cloned().unwrap_or(field.default.clone())
                };
                fields.push(BoundField {
                    key,
                    code: field.code.clone(),
                    label: field.label.clone(),
                    widget: field.widget,
                    value,
                });
            }
            instances.push(BoundInstance { index, fields });
        }

        sections.push(BoundSection {
            code: section.code.clone(),
            display_name: section.display_name.clone(),
            is_repeatable: section.is_repeatable,
            instances,
        });
    }

    BoundForm {
        form_name: schema.name.clone(),
        sections,
    }
}

/// Validate posted values against a schema.
///
/// Order per field: required-presence, then type/range/choice coercion.
/// Calculated fields are recomputed last from their coerced siblings;
/// whatever was posted for them is discarded. A calculation failure
/// lands in the calculated field's own error slot and does not abort
/// the rest of the form.
pub fn validate(schema: &FormSchema, posted: &PostedValues) -> ValidationResult {
    let mut values = ValueMap::new();
    let mut errors: Vec<FieldError> = Vec::new();

    for section in &schema.sections {
        let indices = if section.is_repeatable {
            let found = posted_instances(posted, &section.code);
            if let Some(max) = section.max_instances {
                if found.len() > max {
                    errors.push(FieldError::new(
                        section.code.clone(),
                        format!("section allows at most {max} instances, got {}", found.len()),
                    ));
                    continue;
                }
            }
            found
        } else {
            vec![0]
        };

        for index in indices {
            validate_instance(section, index, posted, &mut values, &mut errors);
        }
    }

    if errors.is_empty() {
        ValidationResult::Valid { values }
    } else {
        ValidationResult::Invalid { errors }
    }
}

fn validate_instance(
    section: &SectionSchema,
    index: usize,
    posted: &PostedValues,
    values: &mut ValueMap,
    errors: &mut Vec<FieldError>,
) {
    // Error slots per field position, so reporting keeps declaration
    // order even though calculated fields are evaluated last.
    let mut slots: Vec<Option<FieldError>> = vec![None; section.fields.len()];

    for (pos, field) in section.fields.iter().enumerate() {
        if field.is_calculated() {
            continue;
        }
        let key = section_field_key(section, index, &field.code);
        let raw = posted.get(&key);

        match raw {
            raw if is_missing(raw) => {
                if field.is_required {
                    slots[pos] = Some(FieldError::new(key, "this field is required"));
                } else {
                    values.insert(key, CdeValue::Null);
                }
            }
            Some(raw) => match coerce(field, raw) {
                Ok(value) => {
                    values.insert(key, value);
                }
                Err(messages) => {
                    slots[pos] = Some(FieldError { key, messages });
                }
            },
            None => unreachable!("missing values are handled by the guard arm"),
        }
    }

    for (pos, field) in section.fields.iter().enumerate() {
        if !field.is_calculated() {
            continue;
        }
        let Some(expr) = field.calculation.as_ref() else {
            continue;
        };
        let key = section_field_key(section, index, &field.code);
        let resolve = |code: &str| sibling_number(values, section, index, code);
        match expr.evaluate(&resolve) {
            Ok(computed) => {
                let rounded = round(computed, field.rules.decimal_precision);
                values.insert(key, CdeValue::Decimal(rounded));
            }
            Err(e) => {
                slots[pos] = Some(FieldError::new(key, e.to_string()));
            }
        }
    }

    errors.extend(slots.into_iter().flatten());
}

fn coerce(field: &FieldDescriptor, raw: &Value) -> Result<CdeValue, Vec<String>> {
    match field.data_type {
        CdeDataType::Text | CdeDataType::File => {
            let s = raw
                .as_str()
                .ok_or_else(|| vec!["expected text".to_string()])?;
            let mut messages = Vec::new();
            if let Some(max) = field.rules.max_length {
                if s.chars().count() > max {
                    messages.push(format!("value exceeds maximum length of {max}"));
                }
            }
            if let Some(pattern) = &field.rules.pattern {
                if !pattern.is_match(s) {
                    messages.push(format!("value does not match pattern `{pattern}`"));
                }
            }
            if messages.is_empty() {
                Ok(CdeValue::Text(s.to_string()))
            } else {
                Err(messages)
            }
        }
        CdeDataType::Integer => {
            let n = integer_of(raw).ok_or_else(|| vec!["expected an integer".to_string()])?;
            check_range(field, n as f64)?;
            Ok(CdeValue::Integer(n))
        }
        CdeDataType::Decimal => {
            let d = number_of(raw).ok_or_else(|| vec!["expected a number".to_string()])?;
            check_range(field, d)?;
            Ok(CdeValue::Decimal(round(d, field.rules.decimal_precision)))
        }
        CdeDataType::Date => {
            let s = raw
                .as_str()
                .ok_or_else(|| vec![format!("expected a date in {DATE_FORMAT} format")])?;
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(CdeValue::Date)
                .map_err(|_| vec![format!("expected a date in {DATE_FORMAT} format")])
        }
        CdeDataType::Choice => {
            let s = raw
                .as_str()
                .ok_or_else(|| vec!["expected a choice key".to_string()])?;
            if field.rules.choices.iter().any(|c| c == s) {
                Ok(CdeValue::Code(s.to_string()))
            } else {
                Err(vec![format!("`{s}` is not a permitted value")])
            }
        }
        CdeDataType::MultiChoice => {
            let keys: Vec<String> = match raw {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => {
                    let mut keys = Vec::with_capacity(items.len());
                    for item in items {
                        match item.as_str() {
                            Some(s) => keys.push(s.to_string()),
                            None => return Err(vec!["expected a list of choice keys".to_string()]),
                        }
                    }
                    keys
                }
                _ => return Err(vec!["expected a list of choice keys".to_string()]),
            };
            let bad: Vec<String> = keys
                .iter()
                .filter(|k| !field.rules.choices.iter().any(|c| c == *k))
                .map(|k| format!("`{k}` is not a permitted value"))
                .collect();
            if bad.is_empty() {
                Ok(CdeValue::MultiCode(keys))
            } else {
                Err(bad)
            }
        }
        CdeDataType::Calculated => unreachable!("calculated fields never accept posted input"),
    }
}

fn check_range(field: &FieldDescriptor, value: f64) -> Result<(), Vec<String>> {
    let mut messages = Vec::new();
    if let Some(min) = field.rules.min_value {
        if value < min {
            messages.push(format!("value must be at least {min}"));
        }
    }
    if let Some(max) = field.rules.max_value {
        if value > max {
            messages.push(format!("value must be at most {max}"));
        }
    }
    if messages.is_empty() { Ok(()) } else { Err(messages) }
}

fn is_missing(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

fn integer_of(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_of(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn round(value: f64, precision: Option<u32>) -> f64 {
    match precision {
        Some(p) => {
            let factor = 10f64.powi(p as i32);
            (value * factor).round() / factor
        }
        None => value,
    }
}

fn section_field_key(section: &SectionSchema, index: usize, code: &str) -> String {
    if section.is_repeatable {
        instance_field_key(&section.code, index, code)
    } else {
        code.to_string()
    }
}

/// Sibling lookup for calculated fields: same-instance values first,
/// then bare top-level codes.
fn sibling_number(
    values: &ValueMap,
    section: &SectionSchema,
    index: usize,
    code: &str,
) -> Option<f64> {
    if section.is_repeatable {
        let key = instance_field_key(&section.code, index, code);
        if let Some(v) = values.get(&key) {
            return v.as_number();
        }
    }
    values.get(code).and_then(CdeValue::as_number)
}

fn recompute(
    field: &FieldDescriptor,
    section: &SectionSchema,
    index: usize,
    fields: &ValueMap,
) -> CdeValue {
    let Some(expr) = field.calculation.as_ref() else {
        return field.default.clone();
    };
    let resolve = |code: &str| sibling_number(fields, section, index, code);
    match expr.evaluate(&resolve) {
        Ok(computed) => CdeValue::Decimal(round(computed, field.rules.decimal_precision)),
        Err(e) => {
            tracing::debug!(code = %field.code, error = %e, "calculated field left unset");
            field.default.clone()
        }
    }
}

/// Instance indices present in a document for one repeatable section,
/// ascending.
fn document_instances(document: &ClinicalDocument, section_code: &str) -> Vec<usize> {
    collect_instances(document.fields.keys().map(String::as_str), section_code)
}

fn posted_instances(posted: &PostedValues, section_code: &str) -> Vec<usize> {
    collect_instances(posted.keys().map(String::as_str), section_code)
}

fn collect_instances<'a>(keys: impl Iterator<Item = &'a str>, section_code: &str) -> Vec<usize> {
    let mut indices: Vec<usize> = keys
        .filter_map(split_field_key)
        .filter(|(section, _, _)| *section == section_code)
        .map(|(_, index, _)| index)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}
