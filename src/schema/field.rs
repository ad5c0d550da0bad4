use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::calc::CalcExpr;
use crate::error::{CdeFormsError, Result};
use crate::types::{CdeDataType, CdeSpec, CdeValue};

/// Input widget a field renders as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    TextInput,
    NumberInput,
    DateInput,
    Select,
    MultiSelect,
    ReadOnly,
    FileUpload,
}

/// A regex rule compiled at descriptor-build time. Equality compares
/// the source pattern; the compiled automaton is derived state.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    pub fn compile(code: &str, source: &str) -> Result<Self> {
        let regex = Regex::new(source).map_err(|e| {
            CdeFormsError::configuration(format!("invalid pattern on CDE `{code}`: {e}"))
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Validation rule set attached to one field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationRules {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub max_length: Option<usize>,
    pub pattern: Option<CompiledPattern>,
    /// Permitted keys for choice fields, in declared order.
    pub choices: Vec<String>,
    /// Rounding precision for decimal and calculated values.
    pub decimal_precision: Option<u32>,
}

/// Concrete input-field descriptor produced from one CDE definition.
/// Never mutated after construction, so schemas are safe to share
/// across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub code: String,
    pub label: String,
    pub data_type: CdeDataType,
    pub widget: WidgetKind,
    pub is_required: bool,
    pub rules: ValidationRules,
    pub default: CdeValue,
    /// Compiled calculation for read-only derived fields.
    pub calculation: Option<CalcExpr>,
}

impl FieldDescriptor {
    pub fn is_calculated(&self) -> bool {
        self.calculation.is_some()
    }
}

/// Translates CDE definitions into field descriptors via a fixed
/// dispatch table keyed on the data type.
#[derive(Debug, Clone)]
pub struct FieldFactory {
    decimal_precision: u32,
}

impl FieldFactory {
    pub fn new(decimal_precision: u32) -> Self {
        Self { decimal_precision }
    }

    pub fn decimal_precision(&self) -> u32 {
        self.decimal_precision
    }

    /// Build the descriptor for one CDE. Misconfigured definitions
    /// (a choice with no permitted values, a calculated field without
    /// an expression) fail here, at form-build time.
    pub fn create_field(&self, spec: &CdeSpec) -> Result<FieldDescriptor> {
        let mut rules = ValidationRules::default();
        let mut calculation = None;

        let widget = match spec.data_type {
            CdeDataType::Text => {
                rules.max_length = spec.max_length;
                if let Some(pattern) = &spec.pattern {
                    rules.pattern = Some(CompiledPattern::compile(&spec.code, pattern)?);
                }
                WidgetKind::TextInput
            }
            CdeDataType::Integer | CdeDataType::Decimal => {
                rules.min_value = spec.min_value;
                rules.max_value = spec.max_value;
                if spec.data_type == CdeDataType::Decimal {
                    rules.decimal_precision = Some(self.decimal_precision);
                }
                WidgetKind::NumberInput
            }
            CdeDataType::Date => WidgetKind::DateInput,
            CdeDataType::Choice => {
                rules.choices = self.permitted_keys(spec)?;
                WidgetKind::Select
            }
            CdeDataType::MultiChoice => {
                rules.choices = self.permitted_keys(spec)?;
                WidgetKind::MultiSelect
            }
            CdeDataType::Calculated => {
                let expression = spec.calculation.as_deref().ok_or_else(|| {
                    CdeFormsError::configuration(format!(
                        "calculated CDE `{}` has no calculation expression",
                        spec.code
                    ))
                })?;
                let expr = CalcExpr::parse(expression).map_err(|e| {
                    CdeFormsError::configuration(format!(
                        "invalid calculation on CDE `{}`: {e}",
                        spec.code
                    ))
                })?;
                calculation = Some(expr);
                rules.decimal_precision = Some(self.decimal_precision);
                WidgetKind::ReadOnly
            }
            CdeDataType::File => WidgetKind::FileUpload,
        };

        Ok(FieldDescriptor {
            code: spec.code.clone(),
            label: spec.label.clone(),
            data_type: spec.data_type,
            widget,
            is_required: spec.is_required,
            rules,
            default: CdeValue::Null,
            calculation,
        })
    }

    fn permitted_keys(&self, spec: &CdeSpec) -> Result<Vec<String>> {
        if spec.permitted_values.is_empty() {
            return Err(CdeFormsError::configuration(format!(
                "choice CDE `{}` has an empty permitted-value list",
                spec.code
            )));
        }
        Ok(spec.permitted_keys().map(str::to_string).collect())
    }

    /// Round a decimal to the configured precision.
    pub fn round_decimal(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.decimal_precision as i32);
        (value * factor).round() / factor
    }
}
