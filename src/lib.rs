//! # cde-forms
//!
//! A metadata-driven clinical form engine for patient registries.
//! Declarative common-data-element (CDE) and form definitions go in;
//! at request time the engine synthesizes form schemas, binds values
//! from a document-shaped per-patient data store, validates input, and
//! persists diffs with a full audit history.
//!
//! ## Components
//!
//! - **Registry**: the catalog of CDE and form definitions, reloadable
//!   in atomic generations
//! - **Schema**: field factory and dynamic form builder, with an LRU
//!   cache keyed per registry generation
//! - **Binder**: populates schemas from stored documents and validates
//!   submissions, collecting every field error in one pass
//! - **Store**: document storage with field-level merge-on-save and an
//!   append-only history collection
//! - **Progress**: completion metrics and create/clear-aware diffs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cde_forms::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let definition = registry::importer::parse_definition(r#"{"code": "demo"}"#)?;
//! let registry = Arc::new(CdeRegistry::new(definition)?);
//! let store = Arc::new(MemoryDataStore::new());
//! let engine = FormEngine::new(EngineConfig::default(), registry, store)?;
//!
//! let schema = engine.build_form("demographics").await?;
//! let patient = PatientKey::new("demo", "p1");
//! let bound = engine.populate_form(&schema, &patient).await?;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod binder;
pub mod calc;
pub mod core;
pub mod error;
pub mod progress;
pub mod registry;
pub mod schema;
pub mod store;
pub mod types;

pub use audit::{AuditEntry, AuditSink, MemoryAuditSink};
pub use binder::{BoundField, BoundForm, BoundInstance, BoundSection, FieldError, ValidationResult};
pub use calc::{CalcError, CalcExpr};
pub use self::core::{CacheConfig, EngineConfig, FormEngine};
pub use error::{CdeFormsError, Result};
pub use progress::{ChangeKind, FieldChange};
pub use registry::{CdeRegistry, RegistryDefinition, RegistrySnapshot};
pub use schema::{
    FieldDescriptor, FieldFactory, FormBuilder, FormSchema, SchemaCache, SectionSchema, WidgetKind,
};
pub use store::ClinicalDataStore;
#[cfg(feature = "memory-store")]
pub use store::MemoryDataStore;
pub use types::{
    CdeDataType, CdeSpec, CdeValue, ClinicalDocument, Collection, DocumentKey, FormSpec,
    HistorySnapshot, PatientKey, PermittedValue, PostedValues, SectionSpec, ValueMap,
};
