//! Append-only audit trail of clinical data changes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::progress::FieldChange;
use crate::types::PatientKey;

/// One audit record: the deltas of a single successful form submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub patient: PatientKey,
    pub form_name: String,
    pub changes: Vec<FieldChange>,
}

impl AuditEntry {
    pub fn new(patient: PatientKey, form_name: impl Into<String>, changes: Vec<FieldChange>) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            patient,
            form_name: form_name.into(),
            changes,
        }
    }
}

/// Sink accepting append-only audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<()>;
}

/// In-memory audit sink, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<()> {
        tracing::debug!(
            patient = %entry.patient.patient_id,
            form = %entry.form_name,
            changes = entry.changes.len(),
            "recorded audit entry"
        );
        self.entries.write().await.push(entry);
        Ok(())
    }
}

impl Clone for MemoryAuditSink {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}
