//! Storage traits and error types
//!
//! This module defines the trait interface for metadata backends and
//! associated error types.

use crate::media::Feed;
use crate::storage::{PersistedRecord, RunRecord, SavedMedia};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Blob error for {key}: {source}")]
    Blob {
        key: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for metadata backend implementations
///
/// Records are unique on (feed, profile, item_id); the backend enforces this
/// on insert and never updates or deletes a record.
pub trait MetadataStore {
    // ===== Item Records =====

    /// Returns true when a record for (profile, item_id) exists in the feed
    fn record_exists(&self, feed: Feed, profile: &str, item_id: i64) -> StorageResult<bool>;

    /// Inserts a record
    ///
    /// Fails with `StorageError::ConstraintViolation` if the (profile, item_id)
    /// pair is already present for the feed.
    fn insert_record(&mut self, record: &PersistedRecord) -> StorageResult<()>;

    /// Gets a record by key
    fn get_record(
        &self,
        feed: Feed,
        profile: &str,
        item_id: i64,
    ) -> StorageResult<Option<PersistedRecord>>;

    /// Counts records of a feed, optionally restricted to one profile
    fn count_records(&self, feed: Feed, profile: Option<&str>) -> StorageResult<u64>;

    /// Record counts per profile, ordered by profile
    fn profile_counts(&self, feed: Feed) -> StorageResult<Vec<(String, u64)>>;

    // ===== Saved Media =====

    /// Looks up media already written to the blob store
    fn get_saved_media(&self, item_id: i64) -> StorageResult<Option<SavedMedia>>;

    /// Marks an item's media as written to the blob store
    fn insert_saved_media(&mut self, media: &SavedMedia) -> StorageResult<()>;

    fn count_saved_media(&self) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new run in the `running` state and returns its id
    fn create_run(&mut self, feed: Feed, profile: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs, newest first
    fn recent_runs(&self, limit: u32) -> StorageResult<Vec<RunRecord>>;

    /// Marks a run as completed with its item counters
    fn complete_run(&mut self, run_id: i64, items_saved: u64, items_skipped: u64)
        -> StorageResult<()>;

    /// Marks a run as failed with the error that stopped it
    fn fail_run(
        &mut self,
        run_id: i64,
        items_saved: u64,
        items_skipped: u64,
        error: &str,
    ) -> StorageResult<()>;

    /// Moves runs left `running` by a previous process to `interrupted`
    ///
    /// Returns the number of runs updated.
    fn interrupt_stale_runs(&mut self) -> StorageResult<usize>;
}
