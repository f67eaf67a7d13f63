//! Media download into the blob store
//!
//! A rendition is downloaded completely into memory and then written to the
//! blob store in one call. There is no retry and no cleanup of partial
//! writes; the caller decides what a failure means.

use crate::storage::BlobStore;
use crate::BackupError;
use reqwest::Client;
use std::sync::Arc;

/// Downloads renditions and stores them under deterministic keys
pub struct BlobFetcher {
    client: Client,
    store: Arc<dyn BlobStore>,
}

impl BlobFetcher {
    pub fn new(client: Client, store: Arc<dyn BlobStore>) -> Self {
        Self { client, store }
    }

    /// Downloads `url` and writes the body under `key`
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - Number of bytes stored
    /// * `Err(BackupError::Http)` - Transport failure
    /// * `Err(BackupError::Status)` - Non-success response
    /// * `Err(BackupError::Storage)` - The blob store rejected the write
    pub async fn fetch_and_store(&self, url: &str, key: &str) -> Result<u64, BackupError> {
        tracing::debug!(url, key, "Downloading media");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| BackupError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackupError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| BackupError::Http {
            url: url.to_string(),
            source,
        })?;

        self.store.put(key, &body).await?;

        tracing::debug!(key, bytes = body.len(), "Stored media");
        Ok(body.len() as u64)
    }
}
