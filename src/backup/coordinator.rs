//! Backup coordinator - page loop, dedupe, download, persist
//!
//! One run walks a single feed of a single profile, page by page and item by
//! item in the order the API returns them. Nothing inside a run is
//! concurrent. The first error of any kind ends the run and is returned; the
//! caller decides whether to continue with other feeds.

use crate::backup::{BlobFetcher, ProgressState};
use crate::media::{select_best, DecodedItem, Feed, MediaItem, Track};
use crate::remote::PageSource;
use crate::storage::{MetadataStore, PersistedRecord, SavedMedia, SqliteStorage};
use crate::BackupError;
use std::sync::Arc;

/// Counters for one finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_fetched: u32,
    pub items_saved: u64,
    pub items_skipped: u64,
}

/// Drives backups of channel timelines and like-lists
pub struct Backup {
    pages: Arc<dyn PageSource>,
    fetcher: BlobFetcher,
    storage: SqliteStorage,
    progress: Arc<ProgressState>,
    config_hash: String,
}

impl Backup {
    pub fn new(
        pages: Arc<dyn PageSource>,
        fetcher: BlobFetcher,
        storage: SqliteStorage,
        progress: Arc<ProgressState>,
    ) -> Self {
        Self {
            pages,
            fetcher,
            storage,
            progress,
            config_hash: String::new(),
        }
    }

    /// Hash recorded on every run row
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = config_hash.into();
        self
    }

    pub fn progress(&self) -> &Arc<ProgressState> {
        &self.progress
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Backs up the channel timeline of `profile`
    pub async fn run_profile(&mut self, profile: &str) -> Result<RunSummary, BackupError> {
        self.run(Feed::Channel, profile).await
    }

    /// Backs up the like-list, recording items under `profile`
    pub async fn run_likes(&mut self, profile: &str) -> Result<RunSummary, BackupError> {
        self.run(Feed::Likes, profile).await
    }

    /// Runs one feed and records the outcome in the run ledger
    pub async fn run(&mut self, feed: Feed, profile: &str) -> Result<RunSummary, BackupError> {
        let run_id = self.storage.create_run(feed, profile, &self.config_hash)?;
        self.progress.run_started(feed, profile);
        tracing::info!(%feed, profile, run_id, "Starting backup run");

        let mut summary = RunSummary::default();
        match self.crawl(feed, profile, &mut summary).await {
            Ok(()) => {
                self.storage
                    .complete_run(run_id, summary.items_saved, summary.items_skipped)?;
                self.progress.finished();
                tracing::info!(
                    %feed,
                    profile,
                    pages = summary.pages_fetched,
                    saved = summary.items_saved,
                    skipped = summary.items_skipped,
                    "Backup run completed"
                );
                Ok(summary)
            }
            Err(e) => {
                self.progress.failed(&e.to_string());
                if let Err(store_err) = self.storage.fail_run(
                    run_id,
                    summary.items_saved,
                    summary.items_skipped,
                    &e.to_string(),
                ) {
                    tracing::warn!(run_id, error = %store_err, "Failed to record run failure");
                }
                Err(e)
            }
        }
    }

    /// The page loop
    ///
    /// Stops on the first empty page, or once the page counter passes
    /// `total_pages` of the most recent response.
    async fn crawl(
        &mut self,
        feed: Feed,
        profile: &str,
        summary: &mut RunSummary,
    ) -> Result<(), BackupError> {
        let mut page = 1u32;

        loop {
            self.progress.fetching_page(feed, profile, page);
            tracing::info!(%feed, profile, page, "Fetching timeline page");

            let response = self.pages.fetch_page(feed, profile, page).await?;
            summary.pages_fetched += 1;

            if response.is_empty() {
                tracing::info!(%feed, profile, page, "Empty page, feed exhausted");
                break;
            }

            let total_pages = response.total_pages;
            self.progress
                .got_page(page, response.per_page, response.total_pages);

            for (index, raw) in response.items.into_iter().enumerate() {
                let decoded = DecodedItem::decode(raw)?;
                self.progress.processing_item(index, &decoded.item);

                if self
                    .storage
                    .record_exists(feed, profile, decoded.item.id)?
                {
                    tracing::debug!(item_id = decoded.item.id, "Item saved before, skipping");
                    summary.items_skipped += 1;
                    self.progress.item_skipped();
                    continue;
                }

                let no_audio = self.save_media(&decoded.item).await?;

                self.storage.insert_record(&PersistedRecord {
                    feed,
                    profile: profile.to_string(),
                    item_id: decoded.item.id,
                    published_at: decoded.item.published_at,
                    raw_payload: decoded.raw_bytes().to_vec(),
                    no_audio,
                })?;

                summary.items_saved += 1;
                self.progress.item_saved();
            }

            page += 1;
            if page > total_pages {
                break;
            }
        }

        Ok(())
    }

    /// Makes sure the item's media is in the blob store
    ///
    /// Media saved earlier (by any feed) is reused. Video is required; a
    /// missing audio track is reported through the returned `no_audio` flag.
    async fn save_media(&mut self, item: &MediaItem) -> Result<bool, BackupError> {
        if let Some(saved) = self.storage.get_saved_media(item.id)? {
            tracing::debug!(item_id = item.id, "Media downloaded before, reusing");
            return Ok(saved.no_audio);
        }

        tracing::info!(item_id = item.id, title = %item.title, "Downloading item");

        let video = select_best(item.variants(Track::Video)).map_err(|_| {
            BackupError::NoSuitableMedia {
                item_id: item.id,
                track: Track::Video,
            }
        })?;
        self.fetcher
            .fetch_and_store(&video.url, &Track::Video.blob_key(item.id))
            .await?;

        let no_audio = match select_best(item.variants(Track::Audio)) {
            Ok(audio) => {
                self.fetcher
                    .fetch_and_store(&audio.url, &Track::Audio.blob_key(item.id))
                    .await?;
                false
            }
            Err(_) => {
                tracing::info!(item_id = item.id, "Item has no audio");
                true
            }
        };

        self.storage.insert_saved_media(&SavedMedia {
            item_id: item.id,
            no_audio,
        })?;

        Ok(no_audio)
    }
}
