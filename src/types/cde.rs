use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CdeFormsError, Result};

/// Data types a common data element can carry. The set is closed: form
/// building dispatches on it with a fixed table rather than open-ended
/// trait objects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CdeDataType {
    Text,
    Integer,
    Decimal,
    Date,
    Choice,
    MultiChoice,
    Calculated,
    File,
}

impl CdeDataType {
    /// Parse the type tag used by registry definition files.
    pub fn parse(code: &str, tag: &str) -> Result<Self> {
        match tag {
            "text" => Ok(Self::Text),
            "integer" => Ok(Self::Integer),
            "decimal" => Ok(Self::Decimal),
            "date" => Ok(Self::Date),
            "choice" => Ok(Self::Choice),
            "multi-choice" => Ok(Self::MultiChoice),
            "calculated" => Ok(Self::Calculated),
            "file" => Ok(Self::File),
            other => Err(CdeFormsError::unsupported_data_type(code, other)),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Decimal)
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Choice | Self::MultiChoice)
    }
}

impl fmt::Display for CdeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Choice => "choice",
            Self::MultiChoice => "multi-choice",
            Self::Calculated => "calculated",
            Self::File => "file",
        };
        write!(f, "{tag}")
    }
}

/// One entry of a choice CDE's permitted-value list. Order is the
/// declared display order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermittedValue {
    pub value: String,
    pub label: String,
}

impl PermittedValue {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Definition of a single common data element. Immutable once loaded
/// into a registry generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CdeSpec {
    pub code: String,
    pub label: String,
    pub data_type: CdeDataType,

    #[serde(default)]
    pub is_required: bool,

    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,

    #[serde(default)]
    pub permitted_values: Vec<PermittedValue>,

    pub calculation: Option<String>,
}

impl CdeSpec {
    pub fn new(code: impl Into<String>, data_type: CdeDataType) -> Self {
        let code = code.into();
        Self {
            label: code.clone(),
            code,
            data_type,
            is_required: false,
            min_value: None,
            max_value: None,
            max_length: None,
            pattern: None,
            permitted_values: Vec::new(),
            calculation: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_range(mut self, min: impl Into<Option<f64>>, max: impl Into<Option<f64>>) -> Self {
        self.min_value = min.into();
        self.max_value = max.into();
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_permitted_value(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.permitted_values.push(PermittedValue::new(value, label));
        self
    }

    pub fn with_calculation(mut self, expression: impl Into<String>) -> Self {
        self.calculation = Some(expression.into());
        self
    }

    pub fn permitted_keys(&self) -> impl Iterator<Item = &str> {
        self.permitted_values.iter().map(|pv| pv.value.as_str())
    }
}
