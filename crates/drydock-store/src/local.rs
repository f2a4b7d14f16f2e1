//! Local disk cache backend
//!
//! Stores each generation under its own directory:
//! `<base_path>/<generation>/<first 2 digest chars>/<digest>.meta|.body`
//!
//! The `.body` file holds the raw response bytes; the `.meta` file holds the
//! key, status, and headers as JSON. The meta file is written last, so a
//! record is only visible once both halves are on disk.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

use crate::backend::{CacheBackend, GenerationStore, ResourceKey, validate_generation};
use crate::error::StoreError;
use crate::response::CachedResponse;

/// Serialized record metadata, written next to the body file
#[derive(Serialize, Deserialize)]
struct RecordMeta {
    key: ResourceKey,
    status: u16,
    headers: Vec<(String, String)>,
}

/// Local disk backend rooted at a base directory
pub struct LocalBackend {
    base_path: PathBuf,
}

impl LocalBackend {
    /// Create a new local backend, creating the base directory if needed
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", base_path.display(), e)))?;

        info!("Initialized local cache store at {:?}", base_path);

        Ok(Self { base_path })
    }
}

#[async_trait]
impl CacheBackend for LocalBackend {
    async fn open(&self, generation: &str) -> Result<Arc<dyn GenerationStore>, StoreError> {
        validate_generation(generation)?;

        let root = self.base_path.join(generation);
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", root.display(), e)))?;

        Ok(Arc::new(LocalStore { root }))
    }

    async fn list_generations(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete_generation(&self, generation: &str) -> Result<bool, StoreError> {
        validate_generation(generation)?;

        let root = self.base_path.join(generation);
        debug!("Deleting generation store at {:?}", root);

        match fs::remove_dir_all(&root).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// One generation's on-disk store
struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Sharded path prefix for a key, without extension
    fn record_path(&self, key: &ResourceKey) -> PathBuf {
        let digest = key.digest();
        self.root.join(&digest[..2]).join(digest)
    }
}

#[async_trait]
impl GenerationStore for LocalStore {
    async fn lookup(&self, key: &ResourceKey) -> Result<Option<CachedResponse>, StoreError> {
        let path = self.record_path(key);

        let meta_raw = match fs::read(path.with_extension("meta")).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let meta: RecordMeta = serde_json::from_slice(&meta_raw)
            .map_err(|e| StoreError::Malformed(format!("{}: {}", key, e)))?;

        let body = match fs::read(path.with_extension("body")).await {
            Ok(raw) => Bytes::from(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Half-written record: meta without body is treated as a miss
                debug!("Cache record {} has no body file, treating as miss", key);
                return Ok(None);
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Some(CachedResponse {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, key: &ResourceKey, response: CachedResponse) -> Result<(), StoreError> {
        let path = self.record_path(key);
        debug!("Writing cache record for {} at {:?}", key, path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let meta = RecordMeta {
            key: key.clone(),
            status: response.status,
            headers: response.headers,
        };
        let meta_raw = serde_json::to_vec(&meta)
            .map_err(|e| StoreError::Malformed(format!("{}: {}", key, e)))?;

        // Write both halves through temp files, body first, then the meta
        // file that makes the record visible
        let body_tmp = path.with_extension("body.tmp");
        fs::write(&body_tmp, &response.body).await?;
        fs::rename(&body_tmp, path.with_extension("body")).await?;

        let meta_tmp = path.with_extension("meta.tmp");
        fs::write(&meta_tmp, &meta_raw).await?;
        fs::rename(&meta_tmp, path.with_extension("meta")).await?;

        Ok(())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<bool, StoreError> {
        let path = self.record_path(key);

        let existed = match fs::remove_file(path.with_extension("meta")).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(StoreError::Io(e)),
        };

        match fs::remove_file(path.with_extension("body")).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e)),
        }

        Ok(existed)
    }

    async fn keys(&self) -> Result<Vec<ResourceKey>, StoreError> {
        let mut keys = Vec::new();
        let mut shards = fs::read_dir(&self.root).await?;

        while let Some(shard) = shards.next_entry().await? {
            if !shard.file_type().await?.is_dir() {
                continue;
            }

            let mut records = fs::read_dir(shard.path()).await?;
            while let Some(record) = records.next_entry().await? {
                let path = record.path();
                if path.extension().and_then(|e| e.to_str()) != Some("meta") {
                    continue;
                }

                let raw = fs::read(&path).await?;
                let meta: RecordMeta = serde_json::from_slice(&raw)
                    .map_err(|e| StoreError::Malformed(format!("{:?}: {}", path, e)))?;
                keys.push(meta.key);
            }
        }

        Ok(keys)
    }
}
