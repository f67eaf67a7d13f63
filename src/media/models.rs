//! Payload types for the platform's timeline API
//!
//! Items stay opaque (`RawValue`) inside a `TimelinePage` so the exact bytes
//! can be archived; each one is decoded exactly once into a `MediaItem`.

use crate::BackupError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::fmt;

/// One rendition of a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub url: String,
    pub size: i64,
}

/// Renditions of one track keyed by rendition name ("higher", "high", "med", ...)
pub type VariantSet = BTreeMap<String, Variant>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Html5Versions {
    #[serde(default, deserialize_with = "lenient_variants")]
    pub video: VariantSet,
    #[serde(default, deserialize_with = "lenient_variants")]
    pub audio: VariantSet,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileVersions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub html5: Html5Versions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permalink: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

/// A decoded timeline item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: i64,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permalink: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: Channel,
    /// `null` decodes as the Unix epoch
    #[serde(deserialize_with = "null_as_epoch")]
    pub published_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub views_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dislikes_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recoubs_count: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favorite: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recoub: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub like: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dislike: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_versions: FileVersions,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: f64,
}

impl MediaItem {
    /// Decodes an opaque item payload
    pub fn decode(raw: &RawValue) -> Result<Self, BackupError> {
        serde_json::from_str(raw.get()).map_err(|source| BackupError::Decode {
            context: "item payload".to_string(),
            source,
        })
    }

    /// Renditions available for a track kind
    pub fn variants(&self, track: Track) -> &VariantSet {
        match track {
            Track::Video => &self.file_versions.html5.video,
            Track::Audio => &self.file_versions.html5.audio,
        }
    }
}

/// A decoded item carried together with the bytes it was decoded from
#[derive(Debug, Clone)]
pub struct DecodedItem {
    pub item: MediaItem,
    pub raw: Box<RawValue>,
}

impl DecodedItem {
    pub fn decode(raw: Box<RawValue>) -> Result<Self, BackupError> {
        let item = MediaItem::decode(&raw)?;
        Ok(Self { item, raw })
    }

    pub fn raw_bytes(&self) -> &[u8] {
        self.raw.get().as_bytes()
    }
}

/// One page of a timeline or like-list
#[derive(Debug, Deserialize)]
pub struct TimelinePage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_pages: u32,
    #[serde(rename = "coubs", default, deserialize_with = "null_as_default")]
    pub items: Vec<Box<RawValue>>,
}

impl TimelinePage {
    /// Parses a timeline API response body
    pub fn from_slice(body: &[u8]) -> Result<Self, BackupError> {
        serde_json::from_slice(body).map_err(|source| BackupError::Decode {
            context: "timeline page".to_string(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The two media channels bundled with every item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Video,
    Audio,
}

impl Track {
    /// Blob key under which this track of an item is stored
    ///
    /// Extensions are fixed per track regardless of the rendition's container.
    pub fn blob_key(&self, item_id: i64) -> String {
        match self {
            Self::Video => format!("{}_video.mp4", item_id),
            Self::Audio => format!("{}_audio.mp3", item_id),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Which list of a profile is being backed up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    /// The profile's own channel timeline
    Channel,
    /// Items the profile liked
    Likes,
}

impl Feed {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Likes => "likes",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "channel" => Some(Self::Channel),
            "likes" => Some(Self::Likes),
            _ => None,
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Treats an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Publication time with `null` mapped to the Unix epoch; the field itself is still required
fn null_as_epoch<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let published_at = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(published_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
}

/// Keeps only the entries that parse as a `Variant`
fn lenient_variants<'de, D>(deserializer: D) -> Result<VariantSet, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| {
            serde_json::from_value::<Variant>(value)
                .ok()
                .map(|variant| (name, variant))
        })
        .collect())
}
