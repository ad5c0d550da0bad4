use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{CdeFormsError, Result};

use super::form::FormSchema;

/// Cache key: built schemas are pure functions of the form name and the
/// registry generation. Entries for stale generations age out because a
/// reload changes the key.
type CacheKey = (String, u64);

pub struct SchemaCache {
    entries: RwLock<LruCache<CacheKey, Arc<FormSchema>>>,
}

impl SchemaCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| CdeFormsError::configuration("schema cache capacity cannot be zero"))?;
        Ok(Self {
            entries: RwLock::new(LruCache::new(capacity)),
        })
    }

    pub async fn get(&self, form_name: &str, generation: u64) -> Option<Arc<FormSchema>> {
        let mut entries = self.entries.write().await;
        entries.get(&(form_name.to_string(), generation)).cloned()
    }

    pub async fn insert(&self, schema: Arc<FormSchema>) {
        let key = (schema.name.clone(), schema.registry_generation);
        let mut entries = self.entries.write().await;
        entries.put(key, schema);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        let entries = self.entries.read().await;
        entries.is_empty()
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache").finish_non_exhaustive()
    }
}
