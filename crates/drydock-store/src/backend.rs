//! Cache backend traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StoreError;
use crate::response::CachedResponse;

/// Identity of a cached resource: retrieval method plus absolute URL.
///
/// Only retrieval requests are ever keyed; the controller never hands a
/// mutating method to the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub method: String,
    pub url: String,
}

impl ResourceKey {
    pub fn new(method: &http::Method, url: impl Into<String>) -> Self {
        Self {
            method: method.as_str().to_string(),
            url: url.into(),
        }
    }

    /// Shorthand for the common GET identity
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(&http::Method::GET, url)
    }

    /// Content-addressable digest of this key, used by disk backends to
    /// derive filesystem paths
    pub fn digest(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// One generation's key-value store.
///
/// Keys are unique per generation; `put` overwrites any prior value for the
/// same key (last-write-wins). Each operation is independently atomic at
/// single-key granularity; no multi-key transactions exist.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Look up the stored response for a key
    async fn lookup(&self, key: &ResourceKey) -> Result<Option<CachedResponse>, StoreError>;

    /// Store a response under a key, superseding any prior value
    async fn put(&self, key: &ResourceKey, response: CachedResponse) -> Result<(), StoreError>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &ResourceKey) -> Result<bool, StoreError>;

    /// Enumerate all keys currently stored
    async fn keys(&self) -> Result<Vec<ResourceKey>, StoreError>;
}

/// A family of named, generation-scoped stores.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Open (creating if absent) the store for a generation
    async fn open(&self, generation: &str) -> Result<Arc<dyn GenerationStore>, StoreError>;

    /// Enumerate the names of all existing generations
    async fn list_generations(&self) -> Result<Vec<String>, StoreError>;

    /// Delete an entire generation's store; returns whether it existed
    async fn delete_generation(&self, generation: &str) -> Result<bool, StoreError>;
}

/// Validate a generation name before it is used as a store identifier.
///
/// Disk backends turn the name into a directory component, so path
/// separators and traversal sequences are rejected.
pub fn validate_generation(name: &str) -> Result<(), StoreError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(StoreError::InvalidGeneration(name.to_string()));
    }
    Ok(())
}
