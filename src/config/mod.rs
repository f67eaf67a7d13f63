//! Configuration module for coub-backup
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use coub_backup::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("backup.toml")).unwrap();
//! println!("Backing up {} profiles", config.backup.profiles.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BackupConfig, Config, RemoteConfig, ServerConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
