use std::sync::Arc;

use crate::audit::{AuditEntry, AuditSink};
use crate::binder::{self, BoundForm, ValidationResult};
use crate::error::Result;
use crate::progress;
use crate::registry::{CdeRegistry, RegistryDefinition};
use crate::schema::{FieldFactory, FormBuilder, FormSchema, SchemaCache};
use crate::store::ClinicalDataStore;
use crate::types::{
    CdeValue, ClinicalDocument, DocumentKey, HistorySnapshot, PatientKey, PostedValues, ValueMap,
};

use super::config::EngineConfig;

/// The engine facade: wires the registry, the form builder, the data
/// store, and the audit sink behind the four library operations.
pub struct FormEngine {
    registry: Arc<CdeRegistry>,
    store: Arc<dyn ClinicalDataStore>,
    audit: Option<Arc<dyn AuditSink>>,
    builder: FormBuilder,
    cache: SchemaCache,
    config: EngineConfig,
}

impl FormEngine {
    pub fn new(
        config: EngineConfig,
        registry: Arc<CdeRegistry>,
        store: Arc<dyn ClinicalDataStore>,
    ) -> Result<Self> {
        let builder = FormBuilder::new(FieldFactory::new(config.decimal_precision));
        let cache = SchemaCache::new(config.cache_config.schema_cache_size)?;
        Ok(Self {
            registry,
            store,
            audit: None,
            builder,
            cache,
            config,
        })
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn registry(&self) -> &Arc<CdeRegistry> {
        &self.registry
    }

    /// Build (or fetch from cache) the schema for one form. Cached per
    /// (form, registry generation); a registry reload changes the key,
    /// so stale schemas are never served.
    pub async fn build_form(&self, form_name: &str) -> Result<Arc<FormSchema>> {
        let snapshot = self.registry.snapshot();
        if let Some(schema) = self.cache.get(form_name, snapshot.generation()).await {
            return Ok(schema);
        }

        let spec = snapshot.form_spec(form_name)?;
        let schema = Arc::new(self.builder.build(&snapshot, spec)?);
        self.cache.insert(Arc::clone(&schema)).await;
        Ok(schema)
    }

    /// Load path: bind the patient's stored values into the schema.
    pub async fn populate_form(
        &self,
        schema: &FormSchema,
        patient: &PatientKey,
    ) -> Result<BoundForm> {
        let document = self.current_document(patient).await?;
        Ok(binder::populate(schema, &document))
    }

    /// Submit path: validate, and on success persist the diff with
    /// full audit history. A validation failure is a normal outcome,
    /// not an error; nothing is persisted for it.
    pub async fn submit_form(
        &self,
        schema: &FormSchema,
        patient: &PatientKey,
        posted: &PostedValues,
    ) -> Result<ValidationResult> {
        let result = binder::validate(schema, posted);
        let ValidationResult::Valid { values } = &result else {
            tracing::debug!(
                form = %schema.name,
                patient = %patient.patient_id,
                errors = result.errors().len(),
                "submission rejected"
            );
            return Ok(result);
        };

        let cdes_key = DocumentKey::cdes(patient);
        let previous = self
            .store
            .load(&cdes_key)
            .await?
            .unwrap_or_default();
        let merged = self.store.save(&cdes_key, values).await?;

        let snapshot = HistorySnapshot::new(&schema.name, merged.fields.clone());
        self.store
            .append_history(&DocumentKey::history(patient), snapshot)
            .await?;

        let score = progress::progress(schema, &merged);
        let mut progress_fields = ValueMap::new();
        progress_fields.insert(
            format!("{}/progress", schema.name),
            CdeValue::Decimal(score),
        );
        self.store
            .save(&DocumentKey::progress(patient), &progress_fields)
            .await?;

        if let Some(sink) = &self.audit {
            let changes = progress::diff(&previous, &merged);
            if !changes.is_empty() {
                sink.record(AuditEntry::new(patient.clone(), &schema.name, changes))
                    .await?;
            }
        }

        tracing::info!(
            form = %schema.name,
            patient = %patient.patient_id,
            fields = values.len(),
            progress = score,
            "form submission saved"
        );

        Ok(result)
    }

    /// Completion fraction of the form against the patient's current
    /// data.
    pub async fn compute_progress(&self, schema: &FormSchema, patient: &PatientKey) -> Result<f64> {
        let document = self.current_document(patient).await?;
        Ok(progress::progress(schema, &document))
    }

    /// Whether the form's applicability predicate holds for the
    /// patient. A form without a predicate always applies; a predicate
    /// that cannot be evaluated (missing values) does not.
    pub async fn form_applies(&self, schema: &FormSchema, patient: &PatientKey) -> Result<bool> {
        let Some(predicate) = &schema.applicability else {
            return Ok(true);
        };
        let document = self.current_document(patient).await?;
        let resolve = |code: &str| document.get(code).and_then(CdeValue::as_number);
        match predicate.evaluate(&resolve) {
            Ok(value) => Ok(value != 0.0),
            Err(e) => {
                tracing::debug!(form = %schema.name, error = %e, "applicability not evaluable");
                Ok(false)
            }
        }
    }

    /// Swap in a new registry definition. Atomic: concurrent form
    /// builds finish against the generation they started with.
    pub fn reload_registry(&self, definition: RegistryDefinition) -> Result<u64> {
        self.registry.reload(definition)
    }

    async fn current_document(&self, patient: &PatientKey) -> Result<ClinicalDocument> {
        Ok(self
            .store
            .load(&DocumentKey::cdes(patient))
            .await?
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
