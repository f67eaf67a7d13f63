//! Statistics generation from the backup database
//!
//! This module provides functionality for extracting and displaying
//! backup statistics from the metadata store.

use crate::media::Feed;
use crate::storage::{MetadataStore, RunRecord};
use crate::BackupError;

/// How many runs `--stats` lists
const RECENT_RUNS: u32 = 10;

/// Backup statistics summary
#[derive(Debug, Clone)]
pub struct BackupStatistics {
    /// Records in the channel timeline table
    pub channel_items: u64,

    /// Records in the like-list table
    pub liked_items: u64,

    /// Items whose media is in the blob store
    pub saved_media: u64,

    /// Channel records per profile
    pub channel_profiles: Vec<(String, u64)>,

    /// Like-list records per profile
    pub likes_profiles: Vec<(String, u64)>,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The metadata store to query
///
/// # Returns
///
/// * `Ok(BackupStatistics)` - Successfully loaded statistics
/// * `Err(BackupError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn MetadataStore) -> Result<BackupStatistics, BackupError> {
    Ok(BackupStatistics {
        channel_items: storage.count_records(Feed::Channel, None)?,
        liked_items: storage.count_records(Feed::Likes, None)?,
        saved_media: storage.count_saved_media()?,
        channel_profiles: storage.profile_counts(Feed::Channel)?,
        likes_profiles: storage.profile_counts(Feed::Likes)?,
        recent_runs: storage.recent_runs(RECENT_RUNS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &BackupStatistics) {
    println!("=== Backup Statistics ===\n");

    println!("Overview:");
    println!("  Channel items: {}", stats.channel_items);
    println!("  Liked items: {}", stats.liked_items);
    println!("  Items with saved media: {}", stats.saved_media);
    println!();

    print_profiles("Channel Profiles", &stats.channel_profiles);
    print_profiles("Like-list Profiles", &stats.likes_profiles);

    if stats.recent_runs.is_empty() {
        println!("No backup runs recorded yet");
        return;
    }

    println!("Recent Runs:");
    for run in &stats.recent_runs {
        println!(
            "  #{} {} {} [{}] started {} saved {} skipped {}",
            run.id,
            run.feed,
            run.profile,
            run.status.to_db_string(),
            run.started_at,
            run.items_saved,
            run.items_skipped
        );
        if let Some(error) = &run.error_message {
            println!("      error: {}", error);
        }
    }
}

fn print_profiles(heading: &str, profiles: &[(String, u64)]) {
    if profiles.is_empty() {
        return;
    }

    println!("{} ({}):", heading, profiles.len());
    for (profile, count) in profiles {
        println!("  - {}: {}", profile, count);
    }
    println!();
}
