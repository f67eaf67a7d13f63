use crate::media::{Variant, VariantSet};
use thiserror::Error;

/// Returned when a variant set has no rendition with a positive size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no suitable media found")]
pub struct NoSuitableMedia;

/// Picks the largest rendition from a variant set
///
/// Only a strictly larger size replaces the current pick and the running
/// maximum starts at zero, so zero or negative sizes are never selected.
/// `VariantSet` iterates in rendition-name order, which makes ties resolve to
/// the lexicographically smallest name.
///
/// # Returns
///
/// * `Ok(&Variant)` - The rendition with the largest declared size
/// * `Err(NoSuitableMedia)` - The set is empty or every size is <= 0
pub fn select_best(variants: &VariantSet) -> Result<&Variant, NoSuitableMedia> {
    let mut best: Option<&Variant> = None;
    let mut size = 0i64;

    for variant in variants.values() {
        if variant.size > size {
            size = variant.size;
            best = Some(variant);
        }
    }

    best.ok_or(NoSuitableMedia)
}
