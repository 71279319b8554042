//! Storage key assignment and content-based deduplication.
//!
//! A storage key is `folder / path-segment / filename-segment . extension`
//! with the two middle pieces chosen by configured strategies. Keys are
//! deterministic for the `url`/`static` strategies, which makes re-uploads
//! of identical content recognizable to external systems.

mod dedup;
mod hash;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dedup::dedupe_media;
pub use hash::{ensure_hash, HashAlgorithm};

use crate::context::RunContext;
use crate::model::Media;

/// Hex characters of the content hash used for `static` filenames.
const STATIC_PREFIX_LEN: usize = 24;

/// Errors from key assignment and hashing.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Reading the media file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Strategy for the directory segment of a storage key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStyle {
    /// No extra segment; everything lands directly under the folder.
    Flat,
    /// A slug derived from the item URL.
    #[default]
    Url,
    /// One random token shared by all media of the same item, so they land
    /// in the same sub-directory.
    Random,
}

/// Strategy for the filename segment of a storage key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameStyle {
    /// A fresh random token per media.
    Random,
    /// A deterministic prefix of the content hash: same bytes, same name.
    #[default]
    Static,
}

/// How storage keys are derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPolicy {
    /// Directory segment strategy.
    #[serde(default)]
    pub path_style: PathStyle,
    /// Filename segment strategy.
    #[serde(default)]
    pub filename_style: FilenameStyle,
    /// Maximum length of a derived segment; longer ones keep their tail.
    #[serde(default = "default_max_segment_len")]
    pub max_segment_len: usize,
}

fn default_max_segment_len() -> usize {
    120
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            path_style: PathStyle::default(),
            filename_style: FilenameStyle::default(),
            max_segment_len: default_max_segment_len(),
        }
    }
}

/// Assigns a storage key to `media` if it does not already have one.
///
/// `static` filenames require the content hash, which is computed here
/// when absent. Assignment is idempotent: a media with a key is returned
/// untouched.
pub fn assign_key(
    media: &mut Media,
    url: &str,
    ctx: &RunContext,
    policy: &KeyPolicy,
) -> Result<(), KeyError> {
    if media.key().is_some() {
        return Ok(());
    }

    let path_segment = match policy.path_style {
        PathStyle::Flat => String::new(),
        PathStyle::Url => truncate_tail(&slug(url), policy.max_segment_len),
        PathStyle::Random => ctx.item_token().to_string(),
    };

    let filename_segment = match policy.filename_style {
        FilenameStyle::Random => uuid::Uuid::new_v4().simple().to_string(),
        FilenameStyle::Static => {
            ensure_hash(media, ctx.hash())?;
            // Recorded as "<label>:<hex>"; the filename uses the hex part.
            let hash = media.hash().unwrap_or_default();
            let hex = hash.split_once(':').map(|(_, h)| h).unwrap_or(hash);
            hex.chars().take(STATIC_PREFIX_LEN).collect()
        }
    };
    let filename_segment = truncate_tail(&filename_segment, policy.max_segment_len);

    let mut key = String::new();
    for segment in [ctx.folder(), path_segment.as_str(), filename_segment.as_str()] {
        if segment.is_empty() {
            continue;
        }
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);
    }
    if let Some(ext) = media.extension() {
        key.push('.');
        key.push_str(&ext);
    }

    media.set_key(key);
    Ok(())
}

/// Derives a filesystem-safe slug from a URL: scheme stripped, every run
/// of non-alphanumeric characters collapsed to a single dash.
pub fn slug(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let mut out = String::with_capacity(without_scheme.len());
    let mut last_dash = true;
    for ch in without_scheme.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Truncates to at most `max` characters, keeping the tail: the end of a
/// derived name carries the distinguishing suffixes (IDs, hashes).
pub fn truncate_tail(segment: &str, max: usize) -> String {
    let count = segment.chars().count();
    if count <= max {
        return segment.to_string();
    }
    segment.chars().skip(count - max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx_with(dir: &TempDir, folder: &str) -> RunContext {
        RunContext::builder()
            .parent_dir(dir.path())
            .folder(folder)
            .build()
            .unwrap()
    }

    fn media_with_bytes(dir: &TempDir, name: &str, bytes: &[u8]) -> Media {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        Media::new(path)
    }

    #[test]
    fn test_slug() {
        assert_eq!(
            slug("https://example.com/post/123?x=1"),
            "example-com-post-123-x-1"
        );
        assert_eq!(slug("no scheme here"), "no-scheme-here");
        assert_eq!(slug("https://"), "");
    }

    #[test]
    fn test_truncate_tail_keeps_suffix() {
        assert_eq!(truncate_tail("abcdef", 10), "abcdef");
        assert_eq!(truncate_tail("abcdef", 3), "def");
    }

    #[test]
    fn test_flat_static_key_is_hash_prefix() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with(&dir, "archive");
        let mut media = media_with_bytes(&dir, "photo.jpg", b"known bytes");

        let policy = KeyPolicy {
            path_style: PathStyle::Flat,
            filename_style: FilenameStyle::Static,
            ..Default::default()
        };
        assign_key(&mut media, "https://example.com/b", &ctx, &policy).unwrap();

        let hex = HashAlgorithm::Sha256
            .digest_file(&media.filename)
            .unwrap();
        let expected = format!("archive/{}.jpg", &hex[..STATIC_PREFIX_LEN]);
        assert_eq!(media.key(), Some(expected.as_str()));
    }

    #[test]
    fn test_assign_key_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with(&dir, "");
        let mut media = media_with_bytes(&dir, "a.jpg", b"bytes");

        let policy = KeyPolicy::default();
        assign_key(&mut media, "https://example.com/a", &ctx, &policy).unwrap();
        let first = media.key().unwrap().to_string();

        // A different policy must not re-key.
        let other = KeyPolicy {
            path_style: PathStyle::Random,
            filename_style: FilenameStyle::Random,
            ..Default::default()
        };
        assign_key(&mut media, "https://example.com/other", &ctx, &other).unwrap();
        assert_eq!(media.key(), Some(first.as_str()));
    }

    #[test]
    fn test_random_path_is_shared_per_item() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with(&dir, "");
        let policy = KeyPolicy {
            path_style: PathStyle::Random,
            filename_style: FilenameStyle::Random,
            ..Default::default()
        };

        let mut a = media_with_bytes(&dir, "a.jpg", b"a");
        let mut b = media_with_bytes(&dir, "b.jpg", b"b");
        assign_key(&mut a, "https://example.com", &ctx, &policy).unwrap();
        assign_key(&mut b, "https://example.com", &ctx, &policy).unwrap();

        let dir_of = |m: &Media| m.key().unwrap().rsplit_once('/').unwrap().0.to_string();
        assert_eq!(dir_of(&a), dir_of(&b));
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_long_url_segment_is_truncated_from_the_front() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with(&dir, "");
        let policy = KeyPolicy {
            path_style: PathStyle::Url,
            filename_style: FilenameStyle::Random,
            max_segment_len: 16,
            ..Default::default()
        };

        let long_url = format!("https://example.com/{}/id-9876", "x".repeat(300));
        let mut media = media_with_bytes(&dir, "a.jpg", b"a");
        assign_key(&mut media, &long_url, &ctx, &policy).unwrap();

        let path_segment = media.key().unwrap().split('/').next().unwrap().to_string();
        assert_eq!(path_segment.chars().count(), 16);
        assert!(path_segment.ends_with("id-9876"));
    }

    #[test]
    fn test_key_without_folder_or_extension() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_with(&dir, "");
        let policy = KeyPolicy {
            path_style: PathStyle::Flat,
            filename_style: FilenameStyle::Static,
            ..Default::default()
        };

        let path = dir.path().join("noext");
        std::fs::write(&path, b"data").unwrap();
        let mut media = Media::new(path);
        assign_key(&mut media, "https://example.com", &ctx, &policy).unwrap();

        let key = media.key().unwrap();
        assert!(!key.contains('/'));
        assert!(!key.contains('.'));
    }
}
