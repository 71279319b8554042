//! A single archived artifact and its metadata.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::value::PropertyValue;

/// Property key holding the content hash once computed.
pub const HASH_KEY: &str = "hash";

/// One concrete artifact: a locally downloaded or generated file, plus the
/// metadata accumulated about it.
///
/// The local file at `filename` is transient; once every configured storage
/// backend holds a copy the caller may delete it. The storage-relative
/// `key` is assigned exactly once, and `urls` collects one externally
/// reachable location per backend after upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Media {
    /// Path to the locally owned temporary file.
    pub filename: PathBuf,

    /// Storage-relative identifier; write-once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,

    /// One reachable URL per storage backend that holds a copy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    urls: Vec<String>,

    /// Extensible property bag; may nest further Media (thumbnails,
    /// previews) one level deep.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, PropertyValue>,

    /// Mimetype derived from the filename extension, computed on first use.
    #[serde(skip)]
    mimetype: OnceCell<String>,
}

impl PartialEq for Media {
    fn eq(&self, other: &Self) -> bool {
        // The mimetype cache is derived state and excluded on purpose.
        self.filename == other.filename
            && self.key == other.key
            && self.urls == other.urls
            && self.properties == other.properties
    }
}

impl Media {
    /// Creates a media for a local file.
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    /// Returns the storage key, if one has been assigned.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Assigns the storage key. A no-op if a key is already set, so
    /// re-running the pipeline on a half-stored item never re-keys.
    pub fn set_key(&mut self, key: impl Into<String>) {
        if self.key.is_none() {
            self.key = Some(key.into());
        }
    }

    /// The reachable URLs recorded so far, one per storage backend.
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Records a reachable URL after a successful upload.
    pub fn add_url(&mut self, url: impl Into<String>) {
        self.urls.push(url.into());
    }

    /// Whether every configured storage backend holds a copy.
    pub fn is_stored(&self, storage_count: usize) -> bool {
        storage_count > 0 && self.urls.len() == storage_count
    }

    /// Reads a property.
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Writes a property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The full property bag.
    pub fn properties(&self) -> &BTreeMap<String, PropertyValue> {
        &self.properties
    }

    /// The recorded content hash, e.g. `"sha256:ab12..."`.
    pub fn hash(&self) -> Option<&str> {
        self.get(HASH_KEY).and_then(PropertyValue::as_str)
    }

    /// Records the content hash.
    pub fn set_hash(&mut self, hash: impl Into<String>) {
        self.set(HASH_KEY, hash.into());
    }

    /// File extension of the local file, lowercased.
    pub fn extension(&self) -> Option<String> {
        self.filename
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Mimetype derived from the filename extension; computed once and
    /// cached for the lifetime of this value.
    pub fn mimetype(&self) -> &str {
        self.mimetype
            .get_or_init(|| mimetype_for(&self.filename).to_string())
    }

    /// Mutable access to media nested one level deep in the property bag
    /// (thumbnail lists, previews). Storing and hashing cascade into these.
    pub fn nested_media_mut(&mut self) -> Vec<&mut Media> {
        let mut nested = Vec::new();
        for value in self.properties.values_mut() {
            match value {
                PropertyValue::Media(media) => nested.push(media.as_mut()),
                PropertyValue::List(items) => {
                    for item in items {
                        if let PropertyValue::Media(media) = item {
                            nested.push(media.as_mut());
                        }
                    }
                }
                _ => {}
            }
        }
        nested
    }

    /// Read-only view of nested media, one level deep.
    pub fn nested_media(&self) -> Vec<&Media> {
        let mut nested = Vec::new();
        for value in self.properties.values() {
            match value {
                PropertyValue::Media(media) => nested.push(media.as_ref()),
                PropertyValue::List(items) => {
                    for item in items {
                        if let PropertyValue::Media(media) = item {
                            nested.push(media.as_ref());
                        }
                    }
                }
                _ => {}
            }
        }
        nested
    }
}

fn mimetype_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
