//! Media item model and rendition selection
//!
//! This module contains:
//! - The timeline page and item payload types returned by the platform API
//! - Feed and track kinds, including blob key naming
//! - Best rendition selection

mod models;
mod select;

pub use models::{
    Channel, DecodedItem, Feed, FileVersions, Html5Versions, MediaItem, TimelinePage, Track,
    Variant, VariantSet,
};
pub use select::{select_best, NoSuitableMedia};
