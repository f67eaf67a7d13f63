//! Live progress of the running backup
//!
//! The coordinator is the only writer; the observability server and anything
//! else holding the `Arc<ProgressState>` may read concurrently. Each mutator
//! takes the single lock once, so a reader sees either all or none of one
//! step's fields. Consecutive steps are not atomic relative to each other.

use crate::media::{Feed, FileVersions, MediaItem};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// What the coordinator is doing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    FetchingPage,
    ProcessingItem,
    Finished,
    Failed,
}

/// Fields of the item currently (or most recently) in flight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemProgress {
    pub id: i64,
    pub kind: String,
    pub permalink: String,
    pub title: String,
    pub channel: String,
    pub published_at: DateTime<Utc>,
    pub views_count: i64,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub favorite: bool,
    pub recoub: bool,
    pub like: bool,
    pub dislike: bool,
    pub file_versions: FileVersions,
}

impl From<&MediaItem> for ItemProgress {
    fn from(item: &MediaItem) -> Self {
        Self {
            id: item.id,
            kind: item.kind.clone(),
            permalink: item.permalink.clone(),
            title: item.title.clone(),
            channel: item.channel.title.clone(),
            published_at: item.published_at,
            views_count: item.views_count,
            likes_count: item.likes_count,
            dislikes_count: item.dislikes_count,
            favorite: item.favorite,
            recoub: item.recoub,
            like: item.like,
            dislike: item.dislike,
            file_versions: item.file_versions.clone(),
        }
    }
}

/// A consistent copy of the progress state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub phase: Phase,
    pub feed: Option<Feed>,
    pub profile: String,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    /// Position of the current item within its page; `None` right after a page arrives
    pub index_in_page: Option<usize>,
    pub item: Option<ItemProgress>,
    /// Counters of the current run
    pub items_saved: u64,
    pub items_skipped: u64,
    pub last_error: Option<String>,
}

/// Mutex-guarded progress snapshot shared between the coordinator and readers
#[derive(Debug, Default)]
pub struct ProgressState {
    inner: Mutex<ProgressSnapshot>,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a full copy of the current state
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.inner.lock().clone()
    }

    /// A run for `profile` is starting; resets the run counters and error
    pub fn run_started(&self, feed: Feed, profile: &str) {
        let mut state = self.inner.lock();
        state.feed = Some(feed);
        state.profile = profile.to_string();
        state.items_saved = 0;
        state.items_skipped = 0;
        state.last_error = None;
    }

    /// About to request `page`
    pub fn fetching_page(&self, feed: Feed, profile: &str, page: u32) {
        let mut state = self.inner.lock();
        state.phase = Phase::FetchingPage;
        state.feed = Some(feed);
        state.profile = profile.to_string();
        state.page = page;
    }

    /// A non-empty page arrived
    pub fn got_page(&self, page: u32, per_page: u32, total_pages: u32) {
        let mut state = self.inner.lock();
        state.page = page;
        state.per_page = per_page;
        state.total_pages = total_pages;
        state.index_in_page = None;
    }

    /// About to dedupe and download `item`
    pub fn processing_item(&self, index: usize, item: &MediaItem) {
        let item = ItemProgress::from(item);
        let mut state = self.inner.lock();
        state.phase = Phase::ProcessingItem;
        state.index_in_page = Some(index);
        state.item = Some(item);
    }

    pub fn item_saved(&self) {
        self.inner.lock().items_saved += 1;
    }

    pub fn item_skipped(&self) {
        self.inner.lock().items_skipped += 1;
    }

    pub fn finished(&self) {
        self.inner.lock().phase = Phase::Finished;
    }

    /// The run stopped on `error`; the last page and item stay visible
    pub fn failed(&self, error: &str) {
        let mut state = self.inner.lock();
        state.phase = Phase::Failed;
        state.last_error = Some(error.to_string());
    }
}
