//! Storage module for persisting backup data
//!
//! This module handles all persistence for the backup pipeline, including:
//! - SQLite metadata: per-feed item records, saved media, run ledger
//! - Blob stores for the downloaded video and audio payloads

mod blob;
mod schema;
mod sqlite;
mod traits;

pub use blob::{BlobObject, BlobStore, FsBlobStore, MemoryBlobStore};
pub use sqlite::SqliteStorage;
pub use traits::{MetadataStore, StorageError, StorageResult};

use crate::media::Feed;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Initializes or opens a metadata database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, StorageError> {
    SqliteStorage::new(path)
}

/// Durable proof that an item's media was fetched and stored for a feed
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedRecord {
    pub feed: Feed,
    pub profile: String,
    pub item_id: i64,
    pub published_at: DateTime<Utc>,
    /// The item payload exactly as the API returned it
    pub raw_payload: Vec<u8>,
    pub no_audio: bool,
}

/// Media blobs already present in the blob store, shared by all feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedMedia {
    pub item_id: i64,
    pub no_audio: bool,
}

/// Represents one backup run of a feed
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub feed: Feed,
    pub profile: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub items_saved: u64,
    pub items_skipped: u64,
    pub error_message: Option<String>,
}

/// Status of a backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
