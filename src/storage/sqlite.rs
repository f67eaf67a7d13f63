//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the MetadataStore trait.

use crate::media::Feed;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{MetadataStore, StorageError, StorageResult};
use crate::storage::{PersistedRecord, RunRecord, RunStatus, SavedMedia};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

/// SQLite metadata backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path`
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn items_table(feed: Feed) -> &'static str {
    match feed {
        Feed::Channel => "profile_items",
        Feed::Likes => "liked_items",
    }
}

/// Maps unique-index failures to `ConstraintViolation`
fn map_insert_error(error: rusqlite::Error) -> StorageError {
    match error {
        rusqlite::Error::SqliteFailure(err, message)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(message.unwrap_or_else(|| err.to_string()))
        }
        other => StorageError::Sqlite(other),
    }
}

const RUN_COLUMNS: &str = "id, feed, profile, config_hash, started_at, finished_at, status,
     items_saved, items_skipped, error_message";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        feed: Feed::from_db_string(&row.get::<_, String>(1)?).unwrap_or(Feed::Channel),
        profile: row.get(2)?,
        config_hash: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(RunStatus::Running),
        items_saved: row.get::<_, i64>(7)? as u64,
        items_skipped: row.get::<_, i64>(8)? as u64,
        error_message: row.get(9)?,
    })
}

impl MetadataStore for SqliteStorage {
    // ===== Item Records =====

    fn record_exists(&self, feed: Feed, profile: &str, item_id: i64) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE profile = ?1 AND item_id = ?2",
                items_table(feed)
            ),
            params![profile, item_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_record(&mut self, record: &PersistedRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} (profile, item_id, published_at, raw_payload, no_audio, saved_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    items_table(record.feed)
                ),
                params![
                    record.profile,
                    record.item_id,
                    record.published_at.to_rfc3339(),
                    record.raw_payload,
                    record.no_audio,
                    now
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn get_record(
        &self,
        feed: Feed,
        profile: &str,
        item_id: i64,
    ) -> StorageResult<Option<PersistedRecord>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT published_at, raw_payload, no_audio FROM {}
                     WHERE profile = ?1 AND item_id = ?2",
                    items_table(feed)
                ),
                params![profile, item_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((published_at, raw_payload, no_audio)) = row else {
            return Ok(None);
        };

        let published_at = DateTime::parse_from_rfc3339(&published_at)
            .map_err(|e| StorageError::Serialization(format!("published_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(Some(PersistedRecord {
            feed,
            profile: profile.to_string(),
            item_id,
            published_at,
            raw_payload,
            no_audio,
        }))
    }

    fn count_records(&self, feed: Feed, profile: Option<&str>) -> StorageResult<u64> {
        let count: i64 = match profile {
            Some(profile) => self.conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE profile = ?1",
                    items_table(feed)
                ),
                params![profile],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", items_table(feed)),
                [],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }

    fn profile_counts(&self, feed: Feed) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT profile, COUNT(*) FROM {} GROUP BY profile ORDER BY profile",
            items_table(feed)
        ))?;

        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }

    // ===== Saved Media =====

    fn get_saved_media(&self, item_id: i64) -> StorageResult<Option<SavedMedia>> {
        let media = self
            .conn
            .query_row(
                "SELECT item_id, no_audio FROM saved_media WHERE item_id = ?1",
                params![item_id],
                |row| {
                    Ok(SavedMedia {
                        item_id: row.get(0)?,
                        no_audio: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(media)
    }

    fn insert_saved_media(&mut self, media: &SavedMedia) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO saved_media (item_id, no_audio, saved_at) VALUES (?1, ?2, ?3)",
                params![media.item_id, media.no_audio, now],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    fn count_saved_media(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM saved_media", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, feed: Feed, profile: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (feed, profile, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feed.to_db_string(),
                profile,
                config_hash,
                now,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: u32) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map(params![limit], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        items_saved: u64,
        items_skipped: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, items_saved = ?3, items_skipped = ?4
             WHERE id = ?5",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                items_saved as i64,
                items_skipped as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(
        &mut self,
        run_id: i64,
        items_saved: u64,
        items_skipped: u64,
        error: &str,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, items_saved = ?3, items_skipped = ?4,
             error_message = ?5 WHERE id = ?6",
            params![
                RunStatus::Failed.to_db_string(),
                now,
                items_saved as i64,
                items_skipped as i64,
                error,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn interrupt_stale_runs(&mut self) -> StorageResult<usize> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE status = ?2",
            params![
                RunStatus::Interrupted.to_db_string(),
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(feed: Feed, profile: &str, item_id: i64) -> PersistedRecord {
        PersistedRecord {
            feed,
            profile: profile.to_string(),
            item_id,
            published_at: Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap(),
            raw_payload: format!(r#"{{"id":{}}}"#, item_id).into_bytes(),
            no_audio: false,
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coub.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage.insert_record(&record(Feed::Channel, "alice", 1)).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert!(storage.record_exists(Feed::Channel, "alice", 1).unwrap());
    }

    #[test]
    fn test_insert_and_exists() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        assert!(!storage.record_exists(Feed::Channel, "alice", 42).unwrap());
        storage.insert_record(&record(Feed::Channel, "alice", 42)).unwrap();

        assert!(storage.record_exists(Feed::Channel, "alice", 42).unwrap());
        assert!(!storage.record_exists(Feed::Channel, "bob", 42).unwrap());
        assert!(!storage.record_exists(Feed::Likes, "alice", 42).unwrap());
    }

    #[test]
    fn test_duplicate_insert_is_constraint_violation() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_record(&record(Feed::Likes, "alice", 7)).unwrap();

        let err = storage
            .insert_record(&record(Feed::Likes, "alice", 7))
            .unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation(_)));
        assert_eq!(storage.count_records(Feed::Likes, Some("alice")).unwrap(), 1);
    }

    #[test]
    fn test_get_record_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut original = record(Feed::Channel, "alice", 9);
        original.no_audio = true;
        storage.insert_record(&original).unwrap();

        let loaded = storage.get_record(Feed::Channel, "alice", 9).unwrap().unwrap();
        assert_eq!(loaded, original);
        assert!(storage.get_record(Feed::Channel, "alice", 10).unwrap().is_none());
    }

    #[test]
    fn test_counts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_record(&record(Feed::Channel, "alice", 1)).unwrap();
        storage.insert_record(&record(Feed::Channel, "alice", 2)).unwrap();
        storage.insert_record(&record(Feed::Channel, "bob", 1)).unwrap();
        storage.insert_record(&record(Feed::Likes, "alice", 3)).unwrap();

        assert_eq!(storage.count_records(Feed::Channel, None).unwrap(), 3);
        assert_eq!(storage.count_records(Feed::Channel, Some("alice")).unwrap(), 2);
        assert_eq!(storage.count_records(Feed::Likes, None).unwrap(), 1);
        assert_eq!(
            storage.profile_counts(Feed::Channel).unwrap(),
            vec![("alice".to_string(), 2), ("bob".to_string(), 1)]
        );
    }

    #[test]
    fn test_saved_media() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_saved_media(5).unwrap().is_none());

        let media = SavedMedia {
            item_id: 5,
            no_audio: true,
        };
        storage.insert_saved_media(&media).unwrap();

        assert_eq!(storage.get_saved_media(5).unwrap(), Some(media));
        assert_eq!(storage.count_saved_media().unwrap(), 1);
        assert!(matches!(
            storage.insert_saved_media(&media),
            Err(StorageError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run(Feed::Channel, "alice", "hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.feed, Feed::Channel);
        assert!(run.finished_at.is_none());

        storage.complete_run(run_id, 3, 4).unwrap();
        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.items_saved, 3);
        assert_eq!(run.items_skipped, 4);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_failed_run_keeps_error() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run(Feed::Likes, "alice", "hash").unwrap();

        storage.fail_run(run_id, 1, 0, "HTTP 500").unwrap();
        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(99),
            Err(StorageError::RunNotFound(99))
        ));
        assert!(matches!(
            storage.complete_run(99, 0, 0),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_interrupt_stale_runs() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let stale = storage.create_run(Feed::Channel, "alice", "hash").unwrap();
        let done = storage.create_run(Feed::Channel, "bob", "hash").unwrap();
        storage.complete_run(done, 0, 0).unwrap();

        assert_eq!(storage.interrupt_stale_runs().unwrap(), 1);
        assert_eq!(storage.get_run(stale).unwrap().status, RunStatus::Interrupted);
        assert_eq!(storage.get_run(done).unwrap().status, RunStatus::Completed);

        let recent = storage.recent_runs(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, done);
    }
}
