//! Duplicate elimination across one item's media list.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::model::Metadata;

use super::hash::{ensure_hash, HashAlgorithm};

/// Drops media whose content hash was already seen earlier in the item's
/// media list, in list order (first occurrence wins).
///
/// Media whose file cannot be hashed are kept: an unreadable file is a
/// storage-stage problem, not grounds for silently discarding the entry.
/// This runs once per item; cross-item deduplication is left to storage
/// and database backends.
///
/// Returns the number of dropped duplicates.
pub fn dedupe_media(item: &mut Metadata, algo: HashAlgorithm) -> usize {
    let mut seen: HashSet<String> = HashSet::new();
    let before = item.media().len();

    item.media_mut().retain_mut(|media| {
        if let Err(e) = ensure_hash(media, algo) {
            warn!(file = %media.filename.display(), "could not hash media, keeping it: {e}");
            return true;
        }
        match media.hash() {
            Some(hash) => seen.insert(hash.to_string()),
            None => true,
        }
    });

    let dropped = before - item.media().len();
    if dropped > 0 {
        debug!(url = item.url_opt().unwrap_or_default(), dropped, "deduplicated media");
    }
    dropped
}
