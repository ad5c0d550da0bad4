pub mod cde;
pub mod document;
pub mod form;
pub mod value;

pub use cde::{CdeDataType, CdeSpec, PermittedValue};
pub use document::{
    ClinicalDocument, Collection, DocumentKey, HistorySnapshot, PatientKey, instance_field_key,
    split_field_key,
};
pub use form::{FormSpec, SectionSpec};
pub use value::{CdeValue, DATE_FORMAT, PostedValues, ValueMap};
