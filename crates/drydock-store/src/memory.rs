//! In-memory cache backend
//!
//! Used by tests and by deployments that do not need the cache to outlive
//! the process.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{CacheBackend, GenerationStore, ResourceKey, validate_generation};
use crate::error::StoreError;
use crate::response::CachedResponse;

/// In-memory backend holding one map per generation
#[derive(Default)]
pub struct MemoryBackend {
    generations: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One generation's in-memory store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<ResourceKey, CachedResponse>>,
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn open(&self, generation: &str) -> Result<Arc<dyn GenerationStore>, StoreError> {
        validate_generation(generation)?;

        let mut generations = self.generations.write();
        let store = generations
            .entry(generation.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::default()))
            .clone();
        Ok(store)
    }

    async fn list_generations(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.generations.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, StoreError> {
        Ok(self.generations.write().remove(generation).is_some())
    }
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn lookup(&self, key: &ResourceKey) -> Result<Option<CachedResponse>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &ResourceKey, response: CachedResponse) -> Result<(), StoreError> {
        self.entries.write().insert(key.clone(), response);
        Ok(())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<ResourceKey>, StoreError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}
