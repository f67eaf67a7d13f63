//! Blob stores for downloaded media
//!
//! Keys are flat strings such as `42_video.mp4`; no hierarchy is assumed.

use crate::storage::traits::{StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A blob read back from a store
#[derive(Debug, Clone)]
pub struct BlobObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

/// Storage for whole media payloads
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `data` under `key`, replacing any previous blob
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()>;

    /// Reads the blob stored under `key`
    async fn get(&self, key: &str) -> StorageResult<BlobObject>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// Guesses a content type from the key's extension
fn content_type_for(key: &str) -> Option<&'static str> {
    match Path::new(key).extension()?.to_str()? {
        "mp4" => Some("video/mp4"),
        "mp3" => Some("audio/mpeg"),
        "json" => Some("application/json"),
        _ => None,
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Blob store writing one file per key into a flat directory
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Opens the store, creating the directory if it does not exist
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| StorageError::Blob {
                key: key.to_string(),
                source,
            })
    }

    async fn get(&self, key: &str) -> StorageResult<BlobObject> {
        let path = self.path_for(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::BlobNotFound(key.to_string()))
            }
            Err(source) => {
                return Err(StorageError::Blob {
                    key: key.to_string(),
                    source,
                })
            }
        };

        Ok(BlobObject {
            content_length: Some(data.len() as u64),
            content_type: content_type_for(key).map(str::to_string),
            data,
        })
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

/// In-process blob store, used for dry runs and tests
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        validate_key(key)?;
        self.blobs.lock().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<BlobObject> {
        let data = self
            .blobs
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::BlobNotFound(key.to_string()))?;

        Ok(BlobObject {
            content_length: Some(data.len() as u64),
            content_type: content_type_for(key).map(str::to_string),
            data,
        })
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.blobs.lock().contains_key(key))
    }
}
