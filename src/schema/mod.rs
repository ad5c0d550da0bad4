//! Dynamic form construction: CDE definitions in, form schemas out.

pub mod cache;
pub mod field;
pub mod form;

pub use cache::SchemaCache;
pub use field::{CompiledPattern, FieldDescriptor, FieldFactory, ValidationRules, WidgetKind};
pub use form::{FormBuilder, FormSchema, SectionSchema};
