//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the backup database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track backup runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feed TEXT NOT NULL,
    profile TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    items_saved INTEGER NOT NULL DEFAULT 0,
    items_skipped INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);

-- Items whose blobs are in the blob store, regardless of feed
CREATE TABLE IF NOT EXISTS saved_media (
    item_id INTEGER PRIMARY KEY,
    no_audio INTEGER NOT NULL DEFAULT 0,
    saved_at TEXT NOT NULL
);

-- Channel timeline records
CREATE TABLE IF NOT EXISTS profile_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile TEXT NOT NULL,
    item_id INTEGER NOT NULL,
    published_at TEXT NOT NULL,
    raw_payload BLOB NOT NULL,
    no_audio INTEGER NOT NULL DEFAULT 0,
    saved_at TEXT NOT NULL,
    UNIQUE(profile, item_id)
);

CREATE INDEX IF NOT EXISTS idx_profile_items_published ON profile_items(profile, published_at);

-- Like-list records
CREATE TABLE IF NOT EXISTS liked_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    profile TEXT NOT NULL,
    item_id INTEGER NOT NULL,
    published_at TEXT NOT NULL,
    raw_payload BLOB NOT NULL,
    no_audio INTEGER NOT NULL DEFAULT 0,
    saved_at TEXT NOT NULL,
    UNIQUE(profile, item_id)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
