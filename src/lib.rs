//! coub-backup: archives coub timelines and like-lists
//!
//! This crate pages through a profile's channel timeline (or like-list),
//! skips items that were already saved, downloads the largest video and audio
//! rendition of every new item into a blob store and records the raw item
//! payload in SQLite. A live progress snapshot is exposed over HTTP.

pub mod backup;
pub mod config;
pub mod media;
pub mod output;
pub mod remote;
pub mod server;
pub mod storage;

use thiserror::Error;

/// Main error type for backup operations
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        source: serde_json::Error,
    },

    #[error("No suitable {track} media found for item {item_id}")]
    NoSuitableMedia { item_id: i64, track: media::Track },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Session error: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Returns true for failures talking to the remote platform
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Status { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

// Re-export commonly used types
pub use backup::{Backup, ProgressSnapshot, ProgressState};
pub use config::Config;
pub use media::{select_best, Feed, MediaItem, Track};
