use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ClinicalDocument, DocumentKey, HistorySnapshot, ValueMap};

/// Document-shaped clinical data storage.
///
/// Contract for the current-data collection: `save` performs
/// insert-if-absent, else a field-level merge where only the named keys
/// are overwritten. Concurrent saves to the same key must be serialized
/// by the implementation; a lost update would corrupt clinical data
/// silently. History is append-only and retrieved in insertion order.
///
/// A load miss is a normal `Ok(None)`. Infrastructure failures surface
/// as `StoreUnavailable`; the core never retries, since a silent retry
/// on a non-idempotent merge is unsafe. The caller decides policy.
#[async_trait]
pub trait ClinicalDataStore: Send + Sync {
    async fn load(&self, key: &DocumentKey) -> Result<Option<ClinicalDocument>>;

    /// Merge the named fields into the document at `key`, creating it
    /// if absent. Returns the merged document with a bumped version.
    async fn save(&self, key: &DocumentKey, fields: &ValueMap) -> Result<ClinicalDocument>;

    async fn append_history(&self, key: &DocumentKey, snapshot: HistorySnapshot) -> Result<()>;

    async fn history(&self, key: &DocumentKey) -> Result<Vec<HistorySnapshot>>;

    async fn delete(&self, key: &DocumentKey) -> Result<bool>;
}
