//! Backup orchestration
//!
//! This module contains the run coordinator, the media fetcher and the
//! shared progress state read by the observability server.

pub mod coordinator;
pub mod fetcher;
pub mod progress;

pub use coordinator::{Backup, RunSummary};
pub use fetcher::BlobFetcher;
pub use progress::{ItemProgress, Phase, ProgressSnapshot, ProgressState};
