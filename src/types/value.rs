use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Date values use one canonical wire format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A typed clinical value as stored in a document. `Null` is an
/// explicit cleared value and is distinct from a missing key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum CdeValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Code(String),
    MultiCode(Vec<String>),
}

impl CdeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Empty for progress purposes: null, blank text, or an empty
    /// multi-choice selection.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) | Self::Code(s) => s.is_empty(),
            Self::MultiCode(vs) => vs.is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Code(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for CdeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, ""),
            Self::Text(s) | Self::Code(s) => write!(f, "{s}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::MultiCode(vs) => write!(f, "{}", vs.join(",")),
        }
    }
}

/// Values posted by a form submission, keyed by field key. Raw JSON
/// values; the validator coerces them per field.
pub type PostedValues = BTreeMap<String, serde_json::Value>;

/// Validated, type-coerced values keyed by field key, ready for the
/// data store.
pub type ValueMap = BTreeMap<String, CdeValue>;
