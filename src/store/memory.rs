use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::Result;
use crate::types::{ClinicalDocument, DocumentKey, HistorySnapshot, ValueMap};

use super::traits::ClinicalDataStore;

/// In-memory reference implementation of the clinical data store.
///
/// Writers to one document key are serialized through a per-key guard
/// table, so a merge never observes a half-applied concurrent save.
/// Readers only hold the map lock for the duration of a clone.
#[derive(Debug)]
pub struct MemoryDataStore {
    documents: Arc<RwLock<HashMap<DocumentKey, ClinicalDocument>>>,
    histories: Arc<RwLock<HashMap<DocumentKey, Vec<HistorySnapshot>>>>,
    write_guards: Arc<papaya::HashMap<DocumentKey, Arc<Mutex<()>>>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
            histories: Arc::new(RwLock::new(HashMap::new())),
            write_guards: Arc::new(papaya::HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.documents.write().await.clear();
        self.histories.write().await.clear();
    }

    fn write_guard(&self, key: &DocumentKey) -> Arc<Mutex<()>> {
        let guards = self.write_guards.pin();
        Arc::clone(guards.get_or_insert_with(key.clone(), || Arc::new(Mutex::new(()))))
    }
}

#[async_trait]
impl ClinicalDataStore for MemoryDataStore {
    async fn load(&self, key: &DocumentKey) -> Result<Option<ClinicalDocument>> {
        let documents = self.documents.read().await;
        Ok(documents.get(key).cloned())
    }

    async fn save(&self, key: &DocumentKey, fields: &ValueMap) -> Result<ClinicalDocument> {
        let guard = self.write_guard(key);
        let _serialized = guard.lock().await;

        let mut documents = self.documents.write().await;
        let document = documents.entry(key.clone()).or_default();
        document.merge(fields);
        document.version += 1;

        tracing::debug!(
            key = %key,
            fields = fields.len(),
            version = document.version,
            "merged document save"
        );

        Ok(document.clone())
    }

    async fn append_history(&self, key: &DocumentKey, snapshot: HistorySnapshot) -> Result<()> {
        let mut histories = self.histories.write().await;
        histories.entry(key.clone()).or_default().push(snapshot);
        Ok(())
    }

    async fn history(&self, key: &DocumentKey) -> Result<Vec<HistorySnapshot>> {
        let histories = self.histories.read().await;
        Ok(histories.get(key).cloned().unwrap_or_default())
    }

    async fn delete(&self, key: &DocumentKey) -> Result<bool> {
        let guard = self.write_guard(key);
        let _serialized = guard.lock().await;

        let mut documents = self.documents.write().await;
        Ok(documents.remove(key).is_some())
    }
}

impl Default for MemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryDataStore {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            histories: Arc::clone(&self.histories),
            write_guards: Arc::clone(&self.write_guards),
        }
    }
}
