//! Output module for reporting on backup data
//!
//! Currently this covers the `--stats` report built from the metadata store.

pub mod stats;

pub use stats::{load_statistics, print_statistics, BackupStatistics};
